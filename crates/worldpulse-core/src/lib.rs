//! Ingestion pipeline core for WorldPulse.
//!
//! This crate owns everything between an external data source and an
//! observer's local view, except the transport:
//!
//! # Modules
//!
//! - [`window`] -- [`EventWindow`], the bounded recency-ordered merge used
//!   by both the hub cache and observer stores.
//! - [`source`] -- the [`EventSource`] trait concrete sources implement.
//! - [`breaker`] -- permanent consecutive-failure circuit breaker.
//! - [`adapter`] -- [`Adapter`], which polls one source on its own timer
//!   and reports batches to a [`BatchSink`].
//! - [`scheduler`] -- [`Scheduler`], owner of every adapter.
//! - [`store`] -- [`ObserverStore`], the observer-side mirror with
//!   featured-event selection.
//! - [`config`] -- Configuration loading from `worldpulse.yaml`.
//!
//! [`EventWindow`]: window::EventWindow
//! [`EventSource`]: source::EventSource
//! [`Adapter`]: adapter::Adapter
//! [`BatchSink`]: adapter::BatchSink
//! [`Scheduler`]: scheduler::Scheduler
//! [`ObserverStore`]: store::ObserverStore

pub mod adapter;
pub mod breaker;
pub mod config;
pub mod scheduler;
pub mod source;
pub mod store;
pub mod window;
