mod guard;

pub use guard::{ContractGuard, GuardOptions, contract_guard_middleware};
