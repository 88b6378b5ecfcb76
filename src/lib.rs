//! Attendance-based payroll engine
//!
//! This crate records attendance, overtime and reimbursements against
//! non-overlapping payroll periods, freezes each period's pay exactly once
//! in a payroll run, and serves payslips that read from that snapshot when
//! it exists and compute the same figures live when it does not.

#![warn(missing_docs)]

pub mod api;
pub mod calculation;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod service;
pub mod store;
