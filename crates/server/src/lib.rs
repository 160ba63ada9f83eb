pub mod a2a;
pub mod bootstrap;
pub mod cli;
pub mod health;
