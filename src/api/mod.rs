pub mod attendance;
pub mod biometric;
pub mod correction;
pub mod payroll;
