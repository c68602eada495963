pub mod heap;
pub mod iterator;
pub mod tuple;

pub use heap::{TableError, TableHeap};
pub use iterator::TableIterator;
pub use tuple::Tuple;
