//! Visiting every element of a partition with a bound, up-to-date context.

use crate::assembly::element_context::ElementContext;
use crate::assembly::types::{ElementOf, FvTypes};
use crate::fv_error::FvError;

#[cfg(feature = "rayon")]
use crate::assembly::model::ModelView;
#[cfg(feature = "rayon")]
use crate::config::ContextConfig;

/// Bind `ctx` to each element in turn, update everything and call `f`.
/// Stops at the first error.
pub fn for_each_element<'m, T, const H: usize, I, F>(
    ctx: &mut ElementContext<'m, T, H>,
    elements: I,
    mut f: F,
) -> Result<(), FvError>
where
    T: FvTypes,
    I: IntoIterator<Item = ElementOf<T>>,
    F: FnMut(&mut ElementContext<'m, T, H>) -> Result<(), FvError>,
{
    for element in elements {
        ctx.update_all(&element)?;
        f(ctx)?;
    }
    Ok(())
}

/// Parallel [`for_each_element`]: every rayon worker builds its own context
/// from `make_stencil` and reuses it for all elements it visits.
#[cfg(feature = "rayon")]
pub fn par_for_each_element<'m, T, const H: usize, S, F>(
    model: &'m dyn ModelView<T>,
    make_stencil: S,
    config: &ContextConfig,
    elements: &[ElementOf<T>],
    f: F,
) -> Result<(), FvError>
where
    T: FvTypes,
    S: Fn() -> T::Stencil + Sync,
    F: Fn(&mut ElementContext<'m, T, H>) -> Result<(), FvError> + Sync,
{
    use rayon::prelude::*;

    log::debug!(
        "parallel sweep over {} elements on {} threads",
        elements.len(),
        rayon::current_num_threads()
    );
    elements.par_iter().try_for_each_init(
        || ElementContext::new(model, make_stencil(), config.clone()),
        |ctx, element| {
            ctx.update_all(element)?;
            f(ctx)
        },
    )
}
