//! # Backend Asymmetry
//!
//! The two correlation backends deliberately disagree:
//!
//! | behavior              | in-process            | keyed-queue            |
//! |-----------------------|-----------------------|------------------------|
//! | unanswered wait       | parks forever         | retryable timeout      |
//! | release before wait   | undefined (rejected)  | queued, never lost     |
//!
//! These tests pin the asymmetry down instead of papering over it.
