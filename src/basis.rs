/// Lobatto hierarchical shape functions and their inner-product tables
pub mod lobatto;
