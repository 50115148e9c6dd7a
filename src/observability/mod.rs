// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Structured logging for the declaration store, resolvers, validator and binder.
//!
//! Every log event is a struct in [`messages`] that implements `Display` for the human
//! readable line and [`StructuredLog`](messages::StructuredLog) for emitting the event with
//! its fields attached. Call sites never format log strings themselves.
//!
//! # Usage
//!
//! ```rust
//! use permute::observability::messages::binder::BindingStarted;
//! use permute::observability::messages::StructuredLog;
//!
//! let msg = BindingStarted {
//!     document: "example1/main.yaml",
//!     binding_count: 3,
//!     pipe_count: 1,
//! };
//!
//! msg.log();
//! ```

pub mod messages;
