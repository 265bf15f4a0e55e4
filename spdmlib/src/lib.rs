// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

//! An implementation of the DMTF Security Protocol and Data Model (SPDM),
//! DSP0274. Both the Requester and the Responder side of the protocol are
//! provided, over pluggable transport and crypto callbacks.

#[macro_use]
extern crate log;

#[macro_use]
extern crate bitflags;

#[macro_use]
pub mod error;

pub mod config;
pub mod time;

pub mod protocol;

pub mod common;
pub mod crypto;
pub mod secret;

pub mod message;

pub mod requester;
pub mod responder;

#[cfg(test)]
pub mod testlib;
