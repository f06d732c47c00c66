mod planning;

pub use planning::{
    calculate_provision_plan, format_provision_plan, ProvisionOutcome, ProvisionState,
    ProvisionStep, ProvisionTarget,
};
