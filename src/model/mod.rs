pub mod attendance;
pub mod correction;
pub mod payroll;
pub mod role;
pub mod user;
