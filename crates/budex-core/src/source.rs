//! Logical datasets the application reads

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// A logical dataset. Each source is backed by one table named after it.
///
/// `External` stands for a file the caller points at directly; it has no
/// registry entry and takes its table name from the file.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive)]
pub enum Source {
    Accounts,
    Activity,
    Allocations,
    Appropriations,
    Authority,
    BudgetObjectClasses,
    Divisions,
    Employees,
    FiscalYears,
    Funds,
    Goals,
    LeaveProjections,
    Objectives,
    Obligations,
    Organizations,
    Outlays,
    PayrollAccounts,
    PayrollHours,
    PayrollObligations,
    Programs,
    ProgramAreas,
    ProgramProjects,
    Projects,
    Reimbursables,
    ResponsibilityCenters,
    ResourcePlanningOffices,
    Supplementals,
    Transfers,
    External,
}

impl Source {
    /// Name of the backing table
    pub fn table_name(self) -> &'static str {
        self.into()
    }

    pub fn is_external(self) -> bool {
        self == Source::External
    }
}
