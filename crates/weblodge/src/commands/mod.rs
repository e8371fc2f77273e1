pub mod delete;
pub mod deploy;
pub mod github;
pub mod list;
pub mod logs;
pub mod tiers;
