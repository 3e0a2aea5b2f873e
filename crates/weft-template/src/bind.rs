#![forbid(unsafe_code)]

//! Live state and the references widgets hold into it.
//!
//! A widget leaf displays a [`Bind`]: a static value, a reference to shared
//! application state ([`Live`]), or, inside a ForEach builder, a field of
//! the current element obtained from [`Elem`]. The analyzer classifies each
//! `Bind` once at compile time; every frame reads the current value through
//! the source traits below.
//!
//! # Locking
//!
//! `Live<T>` wraps an `Arc<parking_lot::RwLock<T>>`. Render passes take
//! *recursive* read locks, so a ForEach over one `Live` may read other parts
//! of the same state while the collection is held. Writers may run on any
//! thread; a frame reads whatever is current when each value is visited, so a
//! render racing a mutation can observe a mix of old and new values.
//!
//! Do not call [`Live::set`] or [`Live::update`] from inside a render
//! callback (a `Custom` draw) on state that the same pass is iterating.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::fmt::{self, Display, Write as _};
use std::marker::PhantomData;
use std::ops::{ControlFlow, Range};
use std::sync::Arc;

use parking_lot::RwLock;

// ============================================================================
// Live state
// ============================================================================

/// Shared, mutable application state that templates read every frame.
pub struct Live<T>(Arc<RwLock<T>>);

impl<T> Live<T> {
    /// Wrap a value.
    pub fn new(value: T) -> Self {
        Self(Arc::new(RwLock::new(value)))
    }

    /// Replace the value.
    pub fn set(&self, value: T) {
        *self.0.write() = value;
    }

    /// Mutate the value in place.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.0.write())
    }

    /// Read the value.
    ///
    /// Uses a recursive read lock, so nested reads of the same state from
    /// one thread never wait on a queued writer.
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.0.read_recursive())
    }

    /// Clone the current value out.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.read(T::clone)
    }
}

impl<T> Clone for Live<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T: Default> Default for Live<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Live<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Live").field(&*self.0.read_recursive()).finish()
    }
}

// ============================================================================
// Source traits
// ============================================================================

/// What kind of value a source produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Text,
    Ratio,
}

impl Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Text => f.write_str("text"),
            ValueKind::Ratio => f.write_str("ratio"),
        }
    }
}

/// A value that lives outside any collection element.
pub trait ExternalSource: Send + Sync {
    fn kind(&self) -> ValueKind;

    /// Append the current value as text.
    fn read_text(&self, out: &mut String);

    /// The current value as a ratio. Text sources report 0.
    fn read_ratio(&self) -> f64 {
        0.0
    }
}

/// A value read from a collection element.
pub trait FieldSource: Send + Sync {
    fn kind(&self) -> ValueKind;

    /// The element type this accessor was written against.
    fn element_type(&self) -> TypeId;

    /// Append the field of `element` (at `index`) as text.
    fn read_text(&self, element: &dyn Any, index: usize, out: &mut String);

    /// The field of `element` as a ratio. Text fields report 0.
    fn read_ratio(&self, _element: &dyn Any, _index: usize) -> f64 {
        0.0
    }
}

/// A dynamically sized sequence a ForEach iterates.
///
/// `base` is the enclosing element for collections nested inside another
/// element, and `None` otherwise.
pub trait CollectionSource: Send + Sync {
    fn element_type(&self) -> TypeId;

    fn element_type_name(&self) -> &'static str;

    /// Size of one element in bytes.
    fn element_size(&self) -> usize;

    /// Current length.
    fn len(&self, base: Option<&dyn Any>) -> usize;

    /// Visit the elements in `range` (clamped to the current length) in
    /// ascending order until `f` breaks.
    fn visit(
        &self,
        base: Option<&dyn Any>,
        range: Range<usize>,
        f: &mut dyn FnMut(usize, &dyn Any) -> ControlFlow<()>,
    );

    /// Whether the contents can never change.
    fn is_static(&self) -> bool {
        false
    }
}

fn visit_slice<T: Any>(
    items: &[T],
    range: Range<usize>,
    f: &mut dyn FnMut(usize, &dyn Any) -> ControlFlow<()>,
) {
    let end = range.end.min(items.len());
    let start = range.start.min(end);
    for (offset, item) in items[start..end].iter().enumerate() {
        if f(start + offset, item).is_break() {
            break;
        }
    }
}

// ----------------------------------------------------------------------------
// External sources
// ----------------------------------------------------------------------------

impl ExternalSource for Live<String> {
    fn kind(&self) -> ValueKind {
        ValueKind::Text
    }

    fn read_text(&self, out: &mut String) {
        self.read(|s| out.push_str(s));
    }
}

impl ExternalSource for Live<f64> {
    fn kind(&self) -> ValueKind {
        ValueKind::Ratio
    }

    fn read_text(&self, out: &mut String) {
        let _ = write!(out, "{}", self.get());
    }

    fn read_ratio(&self) -> f64 {
        self.get()
    }
}

struct TextOf<S, F> {
    live: Live<S>,
    project: F,
}

impl<S, F> ExternalSource for TextOf<S, F>
where
    S: Send + Sync,
    F: Fn(&S) -> &str + Send + Sync,
{
    fn kind(&self) -> ValueKind {
        ValueKind::Text
    }

    fn read_text(&self, out: &mut String) {
        self.live.read(|s| out.push_str((self.project)(s)));
    }
}

struct DisplayOf<S, F> {
    live: Live<S>,
    project: F,
}

impl<S, V, F> ExternalSource for DisplayOf<S, F>
where
    S: Send + Sync,
    V: Display,
    F: Fn(&S) -> V + Send + Sync,
{
    fn kind(&self) -> ValueKind {
        ValueKind::Text
    }

    fn read_text(&self, out: &mut String) {
        self.live.read(|s| {
            let _ = write!(out, "{}", (self.project)(s));
        });
    }
}

struct RatioOf<S, F> {
    live: Live<S>,
    project: F,
}

impl<S, F> ExternalSource for RatioOf<S, F>
where
    S: Send + Sync,
    F: Fn(&S) -> f64 + Send + Sync,
{
    fn kind(&self) -> ValueKind {
        ValueKind::Ratio
    }

    fn read_text(&self, out: &mut String) {
        let _ = write!(out, "{}", self.read_ratio());
    }

    fn read_ratio(&self) -> f64 {
        self.live.read(|s| (self.project)(s))
    }
}

// ----------------------------------------------------------------------------
// Collection sources
// ----------------------------------------------------------------------------

impl<T: Any + Send + Sync> CollectionSource for Live<Vec<T>> {
    fn element_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn element_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn element_size(&self) -> usize {
        size_of::<T>()
    }

    fn len(&self, _base: Option<&dyn Any>) -> usize {
        self.read(Vec::len)
    }

    fn visit(
        &self,
        _base: Option<&dyn Any>,
        range: Range<usize>,
        f: &mut dyn FnMut(usize, &dyn Any) -> ControlFlow<()>,
    ) {
        self.read(|items| visit_slice(items, range, f));
    }
}

/// A collection fixed at compile time.
struct StaticCollection<T>(Arc<[T]>);

impl<T: Any + Send + Sync> CollectionSource for StaticCollection<T> {
    fn element_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn element_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn element_size(&self) -> usize {
        size_of::<T>()
    }

    fn len(&self, _base: Option<&dyn Any>) -> usize {
        self.0.len()
    }

    fn visit(
        &self,
        _base: Option<&dyn Any>,
        range: Range<usize>,
        f: &mut dyn FnMut(usize, &dyn Any) -> ControlFlow<()>,
    ) {
        visit_slice(&self.0, range, f);
    }

    fn is_static(&self) -> bool {
        true
    }
}

/// A slice projected out of shared state.
struct ItemsOf<S, T, F> {
    live: Live<S>,
    project: F,
    _item: PhantomData<fn() -> T>,
}

impl<S, T, F> CollectionSource for ItemsOf<S, T, F>
where
    S: Send + Sync,
    T: Any + Send + Sync,
    F: Fn(&S) -> &[T] + Send + Sync,
{
    fn element_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn element_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn element_size(&self) -> usize {
        size_of::<T>()
    }

    fn len(&self, _base: Option<&dyn Any>) -> usize {
        self.live.read(|s| (self.project)(s).len())
    }

    fn visit(
        &self,
        _base: Option<&dyn Any>,
        range: Range<usize>,
        f: &mut dyn FnMut(usize, &dyn Any) -> ControlFlow<()>,
    ) {
        self.live.read(|s| visit_slice((self.project)(s), range, f));
    }
}

/// A slice projected out of the enclosing element.
struct FieldItems<T, U, F> {
    project: F,
    _types: PhantomData<fn(&T) -> U>,
}

impl<T, U, F> CollectionSource for FieldItems<T, U, F>
where
    T: Any + Send + Sync,
    U: Any + Send + Sync,
    F: Fn(&T) -> &[U] + Send + Sync,
{
    fn element_type(&self) -> TypeId {
        TypeId::of::<U>()
    }

    fn element_type_name(&self) -> &'static str {
        std::any::type_name::<U>()
    }

    fn element_size(&self) -> usize {
        size_of::<U>()
    }

    fn len(&self, base: Option<&dyn Any>) -> usize {
        base.and_then(|b| b.downcast_ref::<T>())
            .map_or(0, |parent| (self.project)(parent).len())
    }

    fn visit(
        &self,
        base: Option<&dyn Any>,
        range: Range<usize>,
        f: &mut dyn FnMut(usize, &dyn Any) -> ControlFlow<()>,
    ) {
        if let Some(parent) = base.and_then(|b| b.downcast_ref::<T>()) {
            visit_slice((self.project)(parent), range, f);
        }
    }
}

// ----------------------------------------------------------------------------
// Field sources
// ----------------------------------------------------------------------------

struct FieldText<T, F> {
    project: F,
    _elem: PhantomData<fn(&T)>,
}

impl<T, F> FieldSource for FieldText<T, F>
where
    T: Any + Send + Sync,
    F: Fn(&T) -> &str + Send + Sync,
{
    fn kind(&self) -> ValueKind {
        ValueKind::Text
    }

    fn element_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn read_text(&self, element: &dyn Any, _index: usize, out: &mut String) {
        if let Some(el) = element.downcast_ref::<T>() {
            out.push_str((self.project)(el));
        }
    }
}

struct FieldDisplay<T, F> {
    project: F,
    _elem: PhantomData<fn(&T)>,
}

impl<T, V, F> FieldSource for FieldDisplay<T, F>
where
    T: Any + Send + Sync,
    V: Display,
    F: Fn(&T) -> V + Send + Sync,
{
    fn kind(&self) -> ValueKind {
        ValueKind::Text
    }

    fn element_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn read_text(&self, element: &dyn Any, _index: usize, out: &mut String) {
        if let Some(el) = element.downcast_ref::<T>() {
            let _ = write!(out, "{}", (self.project)(el));
        }
    }
}

struct FieldRatio<T, F> {
    project: F,
    _elem: PhantomData<fn(&T)>,
}

impl<T, F> FieldSource for FieldRatio<T, F>
where
    T: Any + Send + Sync,
    F: Fn(&T) -> f64 + Send + Sync,
{
    fn kind(&self) -> ValueKind {
        ValueKind::Ratio
    }

    fn element_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn read_text(&self, element: &dyn Any, index: usize, out: &mut String) {
        let _ = write!(out, "{}", self.read_ratio(element, index));
    }

    fn read_ratio(&self, element: &dyn Any, _index: usize) -> f64 {
        element.downcast_ref::<T>().map_or(0.0, |el| (self.project)(el))
    }
}

struct ElementIndex<T>(PhantomData<fn(&T)>);

impl<T: Any> FieldSource for ElementIndex<T> {
    fn kind(&self) -> ValueKind {
        ValueKind::Text
    }

    fn element_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn read_text(&self, _element: &dyn Any, index: usize, out: &mut String) {
        let _ = write!(out, "{index}");
    }
}

// ============================================================================
// Bind
// ============================================================================

/// A literal value known at compile time.
#[derive(Debug, Clone, PartialEq)]
pub enum StaticValue {
    Text(Arc<str>),
    Ratio(f64),
}

impl StaticValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            StaticValue::Text(_) => ValueKind::Text,
            StaticValue::Ratio(_) => ValueKind::Ratio,
        }
    }
}

/// Identity of one ForEach placeholder within a compile session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaceholderId(pub(crate) u64);

/// A field of a placeholder element, as returned by [`Elem`] accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRef {
    pub(crate) owner: PlaceholderId,
    pub(crate) slot: usize,
}

/// A collection reference, optionally nested inside a placeholder element.
#[derive(Clone)]
pub struct CollectionRef {
    pub(crate) owner: Option<PlaceholderId>,
    pub(crate) source: Arc<dyn CollectionSource>,
}

/// What a widget displays or iterates, before analysis.
#[derive(Clone)]
pub enum Bind {
    Static(StaticValue),
    External(Arc<dyn ExternalSource>),
    Field(FieldRef),
    Collection(CollectionRef),
}

impl Bind {
    /// Short description used in error messages.
    pub(crate) fn describe(&self) -> &'static str {
        match self {
            Bind::Static(_) => "static value",
            Bind::External(_) => "external reference",
            Bind::Field(_) => "element field",
            Bind::Collection(_) => "collection",
        }
    }
}

impl fmt::Debug for Bind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bind::Static(v) => f.debug_tuple("Static").field(v).finish(),
            Bind::External(src) => f
                .debug_struct("External")
                .field("kind", &src.kind())
                .finish(),
            Bind::Field(field) => f.debug_tuple("Field").field(field).finish(),
            Bind::Collection(c) => f
                .debug_struct("Collection")
                .field("owner", &c.owner)
                .field("element", &c.source.element_type_name())
                .finish(),
        }
    }
}

impl From<&str> for Bind {
    fn from(value: &str) -> Self {
        Bind::Static(StaticValue::Text(Arc::from(value)))
    }
}

impl From<String> for Bind {
    fn from(value: String) -> Self {
        Bind::Static(StaticValue::Text(Arc::from(value)))
    }
}

impl From<Arc<str>> for Bind {
    fn from(value: Arc<str>) -> Self {
        Bind::Static(StaticValue::Text(value))
    }
}

impl From<f64> for Bind {
    fn from(value: f64) -> Self {
        Bind::Static(StaticValue::Ratio(value))
    }
}

impl From<&Live<String>> for Bind {
    fn from(live: &Live<String>) -> Self {
        Bind::External(Arc::new(live.clone()))
    }
}

impl From<&Live<f64>> for Bind {
    fn from(live: &Live<f64>) -> Self {
        Bind::External(Arc::new(live.clone()))
    }
}

impl<T: Any + Send + Sync> From<&Live<Vec<T>>> for Bind {
    fn from(live: &Live<Vec<T>>) -> Self {
        Bind::Collection(CollectionRef {
            owner: None,
            source: Arc::new(live.clone()),
        })
    }
}

impl<T: Any + Send + Sync> From<Vec<T>> for Bind {
    fn from(items: Vec<T>) -> Self {
        Bind::Collection(CollectionRef {
            owner: None,
            source: Arc::new(StaticCollection(Arc::from(items))),
        })
    }
}

impl From<FieldRef> for Bind {
    fn from(field: FieldRef) -> Self {
        Bind::Field(field)
    }
}

/// Text projected out of shared state.
///
/// ```
/// use weft_template::bind::{self, Live};
///
/// struct App { title: String }
/// let app = Live::new(App { title: "jobs".into() });
/// let title = bind::text(&app, |a: &App| a.title.as_str());
/// ```
pub fn text<S, F>(live: &Live<S>, project: F) -> Bind
where
    S: Send + Sync + 'static,
    F: Fn(&S) -> &str + Send + Sync + 'static,
{
    Bind::External(Arc::new(TextOf {
        live: live.clone(),
        project,
    }))
}

/// Any `Display` value projected out of shared state, shown as text.
pub fn display<S, V, F>(live: &Live<S>, project: F) -> Bind
where
    S: Send + Sync + 'static,
    V: Display + 'static,
    F: Fn(&S) -> V + Send + Sync + 'static,
{
    Bind::External(Arc::new(DisplayOf {
        live: live.clone(),
        project,
    }))
}

/// A ratio projected out of shared state.
pub fn ratio<S, F>(live: &Live<S>, project: F) -> Bind
where
    S: Send + Sync + 'static,
    F: Fn(&S) -> f64 + Send + Sync + 'static,
{
    Bind::External(Arc::new(RatioOf {
        live: live.clone(),
        project,
    }))
}

/// A collection projected out of shared state.
pub fn items<S, T, F>(live: &Live<S>, project: F) -> Bind
where
    S: Send + Sync + 'static,
    T: Any + Send + Sync,
    F: Fn(&S) -> &[T] + Send + Sync + 'static,
{
    Bind::Collection(CollectionRef {
        owner: None,
        source: Arc::new(ItemsOf {
            live: live.clone(),
            project,
            _item: PhantomData,
        }),
    })
}

// ============================================================================
// Elem: the placeholder element handed to ForEach builders
// ============================================================================

/// Placeholder for "the current element" inside a ForEach builder.
///
/// The builder runs once, at compile time. Every accessor registers a field
/// reader in this placeholder's table and returns a reference stamped with
/// the placeholder's id; the analyzer uses the id to tell fields of this
/// element apart from fields of enclosing elements.
pub struct Elem<T> {
    id: PlaceholderId,
    fields: RefCell<Vec<Arc<dyn FieldSource>>>,
    _elem: PhantomData<fn(&T)>,
}

impl<T: Any + Send + Sync> Elem<T> {
    pub(crate) fn new(id: PlaceholderId) -> Self {
        Self {
            id,
            fields: RefCell::new(Vec::new()),
            _elem: PhantomData,
        }
    }

    pub(crate) fn into_fields(self) -> Vec<Arc<dyn FieldSource>> {
        self.fields.into_inner()
    }

    fn register(&self, source: Arc<dyn FieldSource>) -> Bind {
        let mut fields = self.fields.borrow_mut();
        fields.push(source);
        Bind::Field(FieldRef {
            owner: self.id,
            slot: fields.len() - 1,
        })
    }

    /// A string field of the element.
    pub fn text<F>(&self, project: F) -> Bind
    where
        F: Fn(&T) -> &str + Send + Sync + 'static,
    {
        self.register(Arc::new(FieldText {
            project,
            _elem: PhantomData,
        }))
    }

    /// Any `Display` value computed from the element, shown as text.
    pub fn display<V, F>(&self, project: F) -> Bind
    where
        V: Display + 'static,
        F: Fn(&T) -> V + Send + Sync + 'static,
    {
        self.register(Arc::new(FieldDisplay {
            project,
            _elem: PhantomData,
        }))
    }

    /// A ratio computed from the element.
    pub fn ratio<F>(&self, project: F) -> Bind
    where
        F: Fn(&T) -> f64 + Send + Sync + 'static,
    {
        self.register(Arc::new(FieldRatio {
            project,
            _elem: PhantomData,
        }))
    }

    /// The element itself as text.
    pub fn as_text(&self) -> Bind
    where
        T: AsRef<str>,
    {
        self.text(|el: &T| el.as_ref())
    }

    /// The element's position in its collection.
    pub fn index(&self) -> Bind {
        self.register(Arc::new(ElementIndex::<T>(PhantomData)))
    }

    /// A collection nested inside the element, for an inner ForEach.
    pub fn items<U, F>(&self, project: F) -> Bind
    where
        U: Any + Send + Sync,
        F: Fn(&T) -> &[U] + Send + Sync + 'static,
    {
        Bind::Collection(CollectionRef {
            owner: Some(self.id),
            source: Arc::new(FieldItems {
                project,
                _types: PhantomData,
            }),
        })
    }
}
