use crate::model::role::Role;

/// Operations gated by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ClockSelf,
    ViewOwnAttendance,
    ViewCompanyAttendance,
    EditAttendance,
    RunDailyBatch,
    SubmitCorrection,
    ReviewCorrection,
    ManagePayroll,
    ViewOwnPayroll,
}

const TABLE: &[(Capability, &[Role])] = &[
    (Capability::ClockSelf, &[Role::Employee]),
    (Capability::ViewOwnAttendance, &[Role::Employee]),
    (Capability::ViewCompanyAttendance, &[Role::Owner, Role::Admin]),
    (Capability::EditAttendance, &[Role::Owner, Role::Admin]),
    (Capability::RunDailyBatch, &[Role::Owner, Role::Admin]),
    (Capability::SubmitCorrection, &[Role::Employee]),
    (Capability::ReviewCorrection, &[Role::Owner, Role::Admin]),
    (Capability::ManagePayroll, &[Role::Owner, Role::Admin]),
    (Capability::ViewOwnPayroll, &[Role::Employee]),
];

impl Capability {
    pub fn allows(self, role: Role) -> bool {
        TABLE
            .iter()
            .find(|(cap, _)| *cap == self)
            .is_some_and(|(_, roles)| roles.contains(&role))
    }

    pub fn denial(self) -> &'static str {
        match self {
            Capability::ClockSelf
            | Capability::ViewOwnAttendance
            | Capability::SubmitCorrection
            | Capability::ViewOwnPayroll => "Employees only",
            Capability::ViewCompanyAttendance
            | Capability::RunDailyBatch
            | Capability::EditAttendance
            | Capability::ReviewCorrection
            | Capability::ManagePayroll => "Owner/Admin only",
        }
    }
}
