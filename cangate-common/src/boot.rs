// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Boot decision - pure logic without hardware dependencies.
//!
//! The bootloader reads the application vector table and the boot control
//! word, then asks [`decide_boot`] whether to jump or stay resident. While
//! resident, [`spin_action`] maps each download status to what the
//! orchestrator does next.

use crate::config::{MemoryLayout, ENTER_BOOTLOADER_MAGIC};
use crate::download::ProtocolStatus;
use crate::error::FlashError;
use crate::flash::FlashMemory;

const ERASED_WORD: u32 = 0xFFFF_FFFF;

/// First two words of an application image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VectorTable {
    pub initial_sp: u32,
    pub reset_vector: u32,
}

impl VectorTable {
    /// Read the vector table at the start of `layout.application`.
    pub fn read<F: FlashMemory + ?Sized>(
        flash: &F,
        layout: &MemoryLayout,
    ) -> Result<Self, FlashError> {
        let base = layout.application.start;
        Ok(Self {
            initial_sp: flash.read_word(base)?,
            reset_vector: flash.read_word(base + 4)?,
        })
    }

    /// Stack pointer inside RAM (the top of RAM included) and an odd reset
    /// vector inside the application region. Erased words never pass.
    pub fn is_plausible(&self, layout: &MemoryLayout) -> bool {
        if self.initial_sp == ERASED_WORD || self.reset_vector == ERASED_WORD {
            return false;
        }
        let ram = &layout.ram;
        let sp_ok = self.initial_sp >= ram.start && self.initial_sp <= ram.end();
        let reset_ok =
            layout.application.contains(self.reset_vector) && self.reset_vector & 1 == 1;
        sp_ok && reset_ok
    }
}

/// Why the bootloader stays resident.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StayReason {
    /// The application asked for the bootloader through the control word.
    Requested,
    /// No plausible application image.
    InvalidImage,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootDecision {
    JumpToApplication,
    StayResident(StayReason),
}

/// Decide between jumping to the application and entering update mode.
/// `vector_table` is `None` when it could not be read.
pub fn decide_boot(
    vector_table: Option<&VectorTable>,
    layout: &MemoryLayout,
    control_word: u32,
) -> BootDecision {
    if control_word == ENTER_BOOTLOADER_MAGIC {
        return BootDecision::StayResident(StayReason::Requested);
    }
    match vector_table {
        Some(vt) if vt.is_plausible(layout) => BootDecision::JumpToApplication,
        _ => BootDecision::StayResident(StayReason::InvalidImage),
    }
}

/// Next step of the resident bootloader loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpinAction {
    Continue,
    JumpToApplication,
    Reset,
}

/// Map a download status to the orchestrator's next step. A completed
/// transfer jumps and a reset request restarts the boot decision. A verify
/// failure leaves the controller in Error, which asks for the reset on the
/// next frame.
pub fn spin_action(status: ProtocolStatus) -> SpinAction {
    match status {
        ProtocolStatus::Complete => SpinAction::JumpToApplication,
        ProtocolStatus::ResetRequested => SpinAction::Reset,
        ProtocolStatus::Ok
        | ProtocolStatus::VerifyFailed
        | ProtocolStatus::Busy
        | ProtocolStatus::Invalid
        | ProtocolStatus::Error
        | ProtocolStatus::Timeout => SpinAction::Continue,
    }
}
