pub mod migrate;
pub mod orphans;
pub mod owner;
