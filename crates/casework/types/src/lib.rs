//! Case Domain Types for Casework
//!
//! A **case** is one licence request moving through a fixed pipeline of
//! departments. Each department accepts the case, assigns an officer,
//! evaluates it under a business-day deadline, and then either advances
//! it or sends it back.
//!
//! # Key Concepts
//!
//! - **Case**: The aggregate root. Owns the current department and
//!   status, per-department assignments and deadlines, and the audit
//!   history. Mutated only through invariant-preserving methods.
//! - **Department / CaseStatus**: Closed enumerations. Every status
//!   belongs to exactly one department.
//! - **Assignment**: The officer responsible for a department's decision.
//!   Moves Pending → InProgress → {Done, Returned}.
//! - **Deadline**: A per-department due instant measured in business days.
//! - **Transition**: One row of the stage graph, the result of a decision
//!   outcome taken by a department.
//! - **Inspection**: The site visit booked while a case sits in
//!   Inspection, and the report filed with the inspector's decision.
//! - **Intent**: Plain data describing a side effect (notify, generate a
//!   licence) for a collaborator to perform.
//!
//! # Design Principles
//!
//! 1. History is append-only and is written last, after every check passed.
//! 2. Overdue flags are computed from the clock, never asserted by callers.
//! 3. Finalized and archived cases accept no assignments or decisions.

#![deny(unsafe_code)]

mod assignment;
mod case;
mod decision;
mod department;
mod errors;
mod history;
mod ids;
mod inspection;
mod intent;

pub use assignment::*;
pub use case::*;
pub use decision::*;
pub use department::*;
pub use errors::*;
pub use history::*;
pub use ids::*;
pub use inspection::*;
pub use intent::*;
