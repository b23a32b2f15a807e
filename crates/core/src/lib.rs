//! AjeboRush Core - Shared types and storefront rules.
//!
//! This crate provides the domain types and pure business rules used by the
//! storefront service and its tooling:
//! - `storefront` - HTTP service, document store adapters, cart/order services
//! - `cli` - Migrations, catalog seeding and admin fulfilment from the shell
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Everything here can be tested without a store.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, money helpers and status enums
//! - [`catalog`] - Products and variant selection
//! - [`pricing`] - Price resolution for a product + variant
//! - [`cart`] - Cart lines, totals and the decrement confirmation gate
//! - [`order`] - Orders, shipping form validation and order summaries
//! - [`request`] - Bespoke custom requests
//! - [`contact`] - Contact inbox messages
//! - [`review`] - Customer reviews
//! - [`validation`] - Field-level validation errors

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod contact;
pub mod order;
pub mod pricing;
pub mod request;
pub mod review;
pub mod types;
pub mod validation;

pub use cart::{CartLine, DecrementGate, DecrementPlan, GateAction, GateState, LineKey};
pub use catalog::{Portion, Product, ProductDraft, Variant};
pub use contact::{ContactForm, ContactMessage};
pub use order::{Order, OrderLineItem, ShippingAddress, ShippingForm, ValidShipping};
pub use pricing::{PriceError, ResolvedLine};
pub use request::{CustomRequest, CustomRequestForm, ValidCustomRequest};
pub use review::{Review, ReviewForm};
pub use types::*;
pub use validation::ValidationErrors;
