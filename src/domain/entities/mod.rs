mod figure;
mod tabular;

pub use figure::{Figure, Trace};
pub use tabular::TabularData;
