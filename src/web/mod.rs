//! Visitor-facing HTML pages.
//!
//! Uses Askama templates for server-side rendering. Visitors never see JSON
//! or error internals: every hot-path outcome is one of the pages in
//! [`pages`].

pub mod pages;
