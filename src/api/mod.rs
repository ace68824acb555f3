pub mod pagination;

pub use pagination::{PageRequest, Paginated, Pagination};
