//! Polynomials in coefficient form and in evaluation (DFS) form.

mod batch;
mod coefficients;
mod dfs;
mod polymorphic;

pub use batch::{polynomial_product, polynomial_sum};
pub use coefficients::Polynomial;
pub use dfs::PolynomialDfs;
pub use polymorphic::PolymorphicDfs;
