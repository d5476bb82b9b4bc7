//! Owns the libusb context, device handle, and the four transfer handles.
//!
//! Mirrors `ow_engine_init_from_libusb_device_descriptor` /
//! `ow_engine_init_from_bus_address` / `ow_engine_init` / `ow_engine_destroy`.
//! `Drop` replaces the C source's explicit `ow_engine_destroy` bookkeeping —
//! see `SPEC_FULL.md` §5.6 for why that's a deliberate redesign rather than
//! a straight port.

use std::os::raw::c_int;
use std::ptr;

use libusb1_sys::libusb_transfer;

use crate::consts::{ALT_SETTINGS, INTERFACES, USB_CONFIGURATION};
use crate::device::BusAddress;
use crate::error::{Error, Result};

/// The four outstanding USB transfers, allocated once at initialization and
/// freed once at teardown.
pub struct Transfers {
    pub audio_in: *mut libusb_transfer,
    pub audio_out: *mut libusb_transfer,
    pub midi_in: *mut libusb_transfer,
    pub midi_out: *mut libusb_transfer,
}

// SAFETY: the four transfer pointers are only ever dereferenced from inside
// their own completion callbacks (all invoked serially on the libusb event
// thread) or from the owning engine's initialization/teardown code, which
// never overlaps with an in-flight callback by construction (submission only
// happens after `initialize` returns, and teardown only happens after both
// workers are joined).
unsafe impl Send for Transfers {}
unsafe impl Sync for Transfers {}

pub struct UsbSession {
    context: *mut libusb1_sys::libusb_context,
    pub device_handle: *mut libusb1_sys::libusb_device_handle,
    pub transfers: Transfers,
    /// Fetched purely to populate a display label (`device::label`), never
    /// used for transfer addressing once the handle is open.
    pub bus_address: BusAddress,
}

// SAFETY: `context` and `device_handle` are libusb's own opaque handles,
// valid for concurrent use by libusb's own threading contract (one thread
// calls the blocking event-handling function; the others only submit
// transfers or read the status field from within callbacks).
unsafe impl Send for UsbSession {}
unsafe impl Sync for UsbSession {}

impl UsbSession {
    /// Wrap an already-open OS file descriptor (used when another process
    /// owns device enumeration).
    pub fn from_raw_fd(fd: c_int) -> Result<Self> {
        unsafe {
            let mut context: *mut libusb1_sys::libusb_context = ptr::null_mut();
            if libusb1_sys::libusb_init(&mut context) != 0 {
                return Err(Error::LibusbInitFailed);
            }
            let mut device_handle: *mut libusb1_sys::libusb_device_handle = ptr::null_mut();
            let mut sys_fd = fd;
            let rc = libusb1_sys::libusb_wrap_sys_device(context, &mut sys_fd, &mut device_handle);
            if rc != 0 || device_handle.is_null() {
                libusb1_sys::libusb_exit(context);
                return Err(Error::CantOpenDevice);
            }

            // Fetched only to populate a display label; plays no role in
            // transfer addressing.
            let device = libusb1_sys::libusb_get_device(device_handle);
            let bus_address =
                BusAddress { bus: libusb1_sys::libusb_get_bus_number(device), address: libusb1_sys::libusb_get_device_address(device) };

            Self::from_parts(context, device_handle, bus_address)
        }
    }

    /// Enumerate and open the device at the given bus/address.
    pub fn from_bus_address(target: BusAddress) -> Result<Self> {
        unsafe {
            let mut context: *mut libusb1_sys::libusb_context = ptr::null_mut();
            if libusb1_sys::libusb_init(&mut context) != 0 {
                return Err(Error::LibusbInitFailed);
            }

            let mut list: *const *mut libusb1_sys::libusb_device = ptr::null();
            let count = libusb1_sys::libusb_get_device_list(context, &mut list);
            if count < 0 {
                libusb1_sys::libusb_exit(context);
                return Err(Error::LibusbInitFailed);
            }

            let mut found: *mut libusb1_sys::libusb_device = ptr::null_mut();
            for i in 0..count {
                let device = *list.offset(i as isize);
                let bus = libusb1_sys::libusb_get_bus_number(device);
                let address = libusb1_sys::libusb_get_device_address(device);
                if bus == target.bus && address == target.address {
                    found = device;
                    break;
                }
            }

            if found.is_null() {
                libusb1_sys::libusb_free_device_list(list, 1);
                libusb1_sys::libusb_exit(context);
                return Err(Error::CantFindDevice);
            }

            let mut device_handle: *mut libusb1_sys::libusb_device_handle = ptr::null_mut();
            let rc = libusb1_sys::libusb_open(found, &mut device_handle);
            libusb1_sys::libusb_free_device_list(list, 1);
            if rc != 0 || device_handle.is_null() {
                libusb1_sys::libusb_exit(context);
                return Err(Error::CantOpenDevice);
            }

            Self::from_parts(context, device_handle, target)
        }
    }

    unsafe fn from_parts(
        context: *mut libusb1_sys::libusb_context,
        device_handle: *mut libusb1_sys::libusb_device_handle,
        bus_address: BusAddress,
    ) -> Result<Self> {
        unsafe {
            if libusb1_sys::libusb_set_configuration(device_handle, USB_CONFIGURATION as c_int) != 0 {
                Self::teardown_raw(context, device_handle, None);
                return Err(Error::CantSetUsbConfig);
            }

            for (interface, alt_setting) in INTERFACES.iter().zip(ALT_SETTINGS.iter()) {
                if libusb1_sys::libusb_claim_interface(device_handle, *interface as c_int) != 0 {
                    Self::teardown_raw(context, device_handle, None);
                    return Err(Error::CantClaimInterface);
                }
                if libusb1_sys::libusb_set_interface_alt_setting(
                    device_handle,
                    *interface as c_int,
                    *alt_setting as c_int,
                ) != 0
                {
                    Self::teardown_raw(context, device_handle, None);
                    return Err(Error::CantSetAltSetting);
                }
            }

            for endpoint in [
                crate::consts::AUDIO_IN_EP,
                crate::consts::AUDIO_OUT_EP,
                crate::consts::MIDI_IN_EP,
                crate::consts::MIDI_OUT_EP,
            ] {
                if libusb1_sys::libusb_clear_halt(device_handle, endpoint) != 0 {
                    Self::teardown_raw(context, device_handle, None);
                    return Err(Error::CantClearEndpoint);
                }
            }

            let transfers = match Self::alloc_all_transfers() {
                Some(t) => t,
                None => {
                    Self::teardown_raw(context, device_handle, None);
                    return Err(Error::CantPrepareTransfer);
                }
            };

            Ok(Self { context, device_handle, transfers, bus_address })
        }
    }

    unsafe fn alloc_all_transfers() -> Option<Transfers> {
        unsafe {
            let audio_in = super::transfer::alloc_transfer()?;
            let audio_out = super::transfer::alloc_transfer()?;
            let midi_in = super::transfer::alloc_transfer()?;
            let midi_out = super::transfer::alloc_transfer()?;
            Some(Transfers { audio_in, audio_out, midi_in, midi_out })
        }
    }

    unsafe fn teardown_raw(
        context: *mut libusb1_sys::libusb_context,
        device_handle: *mut libusb1_sys::libusb_device_handle,
        transfers: Option<&Transfers>,
    ) {
        unsafe {
            if let Some(t) = transfers {
                super::transfer::free_transfer(t.audio_in);
                super::transfer::free_transfer(t.audio_out);
                super::transfer::free_transfer(t.midi_in);
                super::transfer::free_transfer(t.midi_out);
            }
            libusb1_sys::libusb_close(device_handle);
            libusb1_sys::libusb_exit(context);
        }
    }

    /// Run libusb's blocking event-handling call once, driving all four
    /// completion callbacks that are currently due.
    pub fn handle_events(&self) {
        unsafe {
            libusb1_sys::libusb_handle_events(self.context);
        }
    }
}

impl Drop for UsbSession {
    fn drop(&mut self) {
        unsafe {
            Self::teardown_raw(self.context, self.device_handle, Some(&self.transfers));
        }
    }
}
