#![doc = "notion-jekyll-core: core logic library for notion-jekyll."]

//! Turns pages of a Notion database into Jekyll posts and keeps a repository's posts
//! directory in step with the database.
//!
//! The pure parts (block rendering, front matter, reconciliation) do no I/O. The
//! [`synchronise`] pipeline drives them through the traits in [`contract`].
//!
//! # Usage
//! Build a [`config::SynchroniseConfig`], a [`notion::NotionClient`] and a
//! [`contract::ContentRepository`] implementation, then call
//! [`synchronise::synchronise`].

pub mod assemble;
pub mod block;
pub mod config;
pub mod contract;
pub mod error;
pub mod front_matter;
pub mod model;
pub mod notion;
pub mod page;
pub mod reconcile;
pub mod rich_text;
pub mod synchronise;
