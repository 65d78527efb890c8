//! Walking error chains.
//!
//! All extractors walk outward-to-inward: they start at the error exactly as
//! given and follow `source()` until the chain ends. The first matching node
//! wins, so a value attached by an outer layer shadows one attached deeper.

use std::error::Error;
use std::iter;

use super::layered::{LayerContext, LayeredError};
use super::{as_categorized, Categorized, ClassifiedError};

/// Iterates over `err` and each successive cause, outermost first.
pub fn chain<'a>(err: &'a (dyn Error + 'static)) -> impl Iterator<Item = &'a (dyn Error + 'static)> {
    iter::successors(Some(err), |current: &&'a (dyn Error + 'static)| {
        (*current).source()
    })
}

/// Returns the nearest error of concrete type `T` in the chain, including `err`.
pub fn find_in_chain<'a, T>(err: &'a (dyn Error + 'static)) -> Option<&'a T>
where
    T: Error + 'static,
{
    chain(err).find_map(|node| node.downcast_ref::<T>())
}

/// Returns the innermost error of the chain.
pub fn root_cause<'a>(err: &'a (dyn Error + 'static)) -> &'a (dyn Error + 'static) {
    chain(err).last().unwrap_or(err)
}

/// Returns the first correlation id found in the chain.
///
/// A `ClassifiedError` or `LayeredError` with an absent id is skipped, so an
/// outer wrap that left its id empty exposes the id of an inner one.
pub fn extract_correlation_id<'a>(err: &'a (dyn Error + 'static)) -> Option<&'a str> {
    chain(err).find_map(|node| {
        if let Some(classified) = node.downcast_ref::<ClassifiedError>() {
            return classified.correlation_id();
        }
        node.downcast_ref::<LayeredError>()
            .and_then(|layered| layered.context().correlation_id.as_deref())
    })
}

/// Returns the context of the first `LayeredError` recorded by `layer_name`.
pub fn extract_layer_context<'a>(
    err: &'a (dyn Error + 'static),
    layer_name: &str,
) -> Option<&'a LayerContext> {
    chain(err)
        .filter_map(|node| node.downcast_ref::<LayeredError>())
        .map(LayeredError::context)
        .find(|context| context.layer == layer_name)
}

/// Returns the nearest error in the chain that exposes a category.
pub fn nearest_categorized<'a>(err: &'a (dyn Error + 'static)) -> Option<&'a dyn Categorized> {
    chain(err).find_map(as_categorized)
}
