// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! gs_usb protocol constants, as used by the Linux `gs_usb` driver.

// Vendor requests (bRequest)
pub const GS_USB_BREQ_HOST_FORMAT: u8 = 0;
pub const GS_USB_BREQ_BITTIMING: u8 = 1;
pub const GS_USB_BREQ_MODE: u8 = 2;
pub const GS_USB_BREQ_BERR: u8 = 3;
pub const GS_USB_BREQ_BT_CONST: u8 = 4;
pub const GS_USB_BREQ_DEVICE_CONFIG: u8 = 5;
pub const GS_USB_BREQ_TIMESTAMP: u8 = 6;
pub const GS_USB_BREQ_IDENTIFY: u8 = 7;
pub const GS_USB_BREQ_GET_USER_ID: u8 = 8;
pub const GS_USB_BREQ_SET_USER_ID: u8 = 9;
pub const GS_USB_BREQ_DATA_BITTIMING: u8 = 10;
pub const GS_USB_BREQ_BT_CONST_EXT: u8 = 11;
pub const GS_USB_BREQ_SET_TERMINATION: u8 = 12;
pub const GS_USB_BREQ_GET_TERMINATION: u8 = 13;
pub const GS_USB_BREQ_GET_STATE: u8 = 14;

// Mode values
pub const GS_CAN_MODE_RESET: u32 = 0;
pub const GS_CAN_MODE_START: u32 = 1;

// Mode flags
pub const GS_CAN_MODE_NORMAL: u32 = 0;
pub const GS_CAN_MODE_LISTEN_ONLY: u32 = 1 << 0;
pub const GS_CAN_MODE_LOOP_BACK: u32 = 1 << 1;
pub const GS_CAN_MODE_TRIPLE_SAMPLE: u32 = 1 << 2;
pub const GS_CAN_MODE_ONE_SHOT: u32 = 1 << 3;
pub const GS_CAN_MODE_HW_TIMESTAMP: u32 = 1 << 4;
pub const GS_CAN_MODE_FD: u32 = 1 << 8;
pub const GS_CAN_MODE_BERR_REPORTING: u32 = 1 << 12;

// Feature flags
pub const GS_CAN_FEATURE_LISTEN_ONLY: u32 = 1 << 0;
pub const GS_CAN_FEATURE_LOOP_BACK: u32 = 1 << 1;
pub const GS_CAN_FEATURE_TRIPLE_SAMPLE: u32 = 1 << 2;
pub const GS_CAN_FEATURE_ONE_SHOT: u32 = 1 << 3;
pub const GS_CAN_FEATURE_HW_TIMESTAMP: u32 = 1 << 4;
pub const GS_CAN_FEATURE_IDENTIFY: u32 = 1 << 5;
pub const GS_CAN_FEATURE_USER_ID: u32 = 1 << 6;
pub const GS_CAN_FEATURE_PAD_PKTS_TO_MAX_PKT_SIZE: u32 = 1 << 7;
pub const GS_CAN_FEATURE_FD: u32 = 1 << 8;
pub const GS_CAN_FEATURE_REQ_USB_QUIRK_LPC546XX: u32 = 1 << 9;
pub const GS_CAN_FEATURE_BT_CONST_EXT: u32 = 1 << 10;
pub const GS_CAN_FEATURE_TERMINATION: u32 = 1 << 11;
pub const GS_CAN_FEATURE_BERR_REPORTING: u32 = 1 << 12;
pub const GS_CAN_FEATURE_GET_STATE: u32 = 1 << 13;

/// Features advertised in BT_CONST and BT_CONST_EXT.
pub const DEVICE_FEATURES: u32 = GS_CAN_FEATURE_LISTEN_ONLY
    | GS_CAN_FEATURE_LOOP_BACK
    | GS_CAN_FEATURE_TRIPLE_SAMPLE
    | GS_CAN_FEATURE_ONE_SHOT
    | GS_CAN_FEATURE_BERR_REPORTING
    | GS_CAN_FEATURE_FD
    | GS_CAN_FEATURE_BT_CONST_EXT;

// CAN ID flags
pub const CAN_EFF_FLAG: u32 = 0x8000_0000;
pub const CAN_RTR_FLAG: u32 = 0x4000_0000;
pub const CAN_ERR_FLAG: u32 = 0x2000_0000;
pub const CAN_SFF_MASK: u32 = 0x0000_07FF;
pub const CAN_EFF_MASK: u32 = 0x1FFF_FFFF;

// Host frame flags
pub const GS_CAN_FLAG_OVERFLOW: u8 = 1 << 0;
pub const GS_CAN_FLAG_FD: u8 = 1 << 1;
pub const GS_CAN_FLAG_BRS: u8 = 1 << 2;
pub const GS_CAN_FLAG_ESI: u8 = 1 << 3;

// Channel states reported by GET_STATE
pub const GS_CAN_STATE_ERROR_ACTIVE: u32 = 0;
pub const GS_CAN_STATE_ERROR_WARNING: u32 = 1;
pub const GS_CAN_STATE_ERROR_PASSIVE: u32 = 2;
pub const GS_CAN_STATE_BUS_OFF: u32 = 3;
pub const GS_CAN_STATE_STOPPED: u32 = 4;
pub const GS_CAN_STATE_SLEEPING: u32 = 5;

pub const GS_CAN_TERMINATION_STATE_OFF: u32 = 0;
pub const GS_CAN_TERMINATION_STATE_ON: u32 = 1;

/// Echo ID of frames received from the bus, as opposed to TX echoes.
pub const GS_HOST_FRAME_ECHO_ID_RX: u32 = 0xFFFF_FFFF;

pub const GS_DEVICE_SW_VERSION: u32 = 0x0001_0000;
pub const GS_DEVICE_HW_VERSION: u32 = 0x0001_0000;
