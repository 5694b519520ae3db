pub mod effect;
pub mod engine;
pub mod expression;
pub mod fanout;
pub mod foreign_key;
pub mod generators;
pub mod modifiers;
pub mod providers;
pub mod unique;
pub mod value;

pub use engine::{generate, CancellationToken, GeneratedTable, GeneratedTables};
pub use value::Value;
