pub mod company;
pub mod email;
pub mod founder;
pub mod link;
pub mod tech_stack;
pub mod webpage;
