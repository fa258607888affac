//! L9961 register addresses.

// Control.
pub const CELL_BAL: u8 = 0x01;
pub const CFG1_FILTERS_CYCLES: u8 = 0x02;
pub const CFG2_ENABLES: u8 = 0x04;

// Thresholds.
pub const CSA_GAIN_FACTOR: u8 = 0x05;
pub const VCELL_OV_TH: u8 = 0x06;
pub const VCELL_UV_TH: u8 = 0x07;
pub const VCELL_SEVERE_DELTA_THRS: u8 = 0x08;
pub const VCELL_BAL_UV_DELTA_TH: u8 = 0x09;
pub const VB_OV_TH: u8 = 0x0a;
pub const VB_UV_TH: u8 = 0x0b;
pub const VB_SUM_MAX_DIFF_TH: u8 = 0x0c;
pub const VNTC_OT_TH: u8 = 0x0d;
pub const VNTC_UT_TH: u8 = 0x0e;
pub const VNTC_SEVERE_OT_TH: u8 = 0x0f;
pub const OVC_THRESHOLDS: u8 = 0x10;
pub const PERSISTENT_OVC_THRESHOLDS: u8 = 0x11;
pub const SC_THRESHOLD: u8 = 0x12;

// Masks.
pub const TO_PRDV_BAL_MSK: u8 = 0x13;
pub const TO_FUSE_RST_MSK: u8 = 0x14;
pub const TO_FAULTN_MSK: u8 = 0x15;
pub const CURR_MSK: u8 = 0x16;

// Identity, writable side.
pub const MANUFACTURER_NAME_MSB: u8 = 0x17;
pub const MANUFACTURER_NAME_LSB: u8 = 0x18;
pub const MANUFACTURING_DATE: u8 = 0x19;
pub const FIRST_USAGE_DATE: u8 = 0x1a;
pub const SERIAL_NUMBER_MSB: u8 = 0x1b;
pub const SERIAL_NUMBER_LSB: u8 = 0x1c;
pub const DEVICE_NAME_MSB: u8 = 0x1d;
pub const DEVICE_NAME_LSB: u8 = 0x1e;

// Commands. 0x21 to 0x24 double as measurement registers when read.
pub const NVM_CMD: u8 = 0x20;
pub const GO2SHIP: u8 = 0x21;
pub const GO2STBY: u8 = 0x22;
pub const FUSE_TRIG_ARM: u8 = 0x23;
pub const FUSE_TRIG_FIRE: u8 = 0x24;

// Measurements.
pub const VCELL1_MEAS: u8 = 0x21;
pub const VCELLSUM_MEAS: u8 = 0x26;
pub const VB_MEAS: u8 = 0x27;
pub const NTC_GPIO_MEAS: u8 = 0x28;
pub const DIE_TEMP_MEAS: u8 = 0x29;
pub const CURR_MEAS: u8 = 0x2c;
pub const CC_ACC_MSB: u8 = 0x2d;
pub const CC_ACC_LSB_CNTR: u8 = 0x2e;

// Diagnostics.
pub const DIAG_OV_OT_UT: u8 = 0x2a;
pub const DIAG_UV: u8 = 0x2b;
pub const DIAG_CURR: u8 = 0x2f;

// Identity, readable side.
pub const MANUFACTURER_NAME_MSB_RD: u8 = 0x30;
pub const MANUFACTURER_NAME_LSB_RD: u8 = 0x31;
pub const MANUFACTURING_DATE_RD: u8 = 0x32;
pub const FIRST_USAGE_DATE_RD: u8 = 0x33;
pub const SERIAL_NUMBER_MSB_RD: u8 = 0x34;
pub const SERIAL_NUMBER_LSB_RD: u8 = 0x35;
pub const DEVICE_NAME_MSB_RD: u8 = 0x36;
pub const DEVICE_NAME_LSB_RD: u8 = 0x37;

/// Payload committing register contents to non-volatile memory.
pub const NVM_DOWNLOAD: u16 = 0xaaaa;
/// Payload restoring register contents from non-volatile memory.
pub const NVM_UPLOAD: u16 = 0x5555;
