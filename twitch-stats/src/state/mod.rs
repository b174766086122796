//! Last-known per-channel statistics.

mod store;

pub use store::{
    ChannelState, ChannelView, CycleInfo, StateStore, StoreSnapshot, StreamSnapshot, Transition,
};
