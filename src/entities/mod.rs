// Entity Models - settlement context records
//
// The project and subcontract a settlement is reviewed against. These are
// read-only context within the workbench: displayed, and handed to the
// narrative provider, never mutated by the settlement flow.

pub mod project;
pub mod subcontract;

pub use project::ProjectFinancials;
pub use subcontract::SubcontractInfo;
