pub mod avl_tree;
pub mod bst;
pub mod equal_paths;
pub mod error;
pub mod pool;
pub mod shared_string_writer;
