//! HTML rewriting for documents relayed from the upstream.
//!
//! [`tokenizer`] finds tags and text in the original document,
//! [`rewriter`] applies span-addressed edits to it, and [`modifier`] decides
//! which edits to make.

pub mod modifier;
pub mod rewriter;
pub mod tokenizer;
