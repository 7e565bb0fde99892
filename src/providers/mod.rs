pub mod eastmoney;
pub mod resolver;
pub mod sina;
pub mod util;

pub use resolver::ValuationResolver;
