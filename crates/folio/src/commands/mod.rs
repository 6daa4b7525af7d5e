//! CLI command implementations.

pub(crate) mod publish;

pub(crate) use publish::PublishArgs;
