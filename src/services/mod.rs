pub mod keygen;
pub mod links;

pub use links::LinkService;
