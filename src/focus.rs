//! Bringing the owning player's window to the front.

use thiserror::Error;

/// Window class registered by MPV.
pub const MPV_WINDOW_CLASS: &str = "mpv";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FocusError {
  #[error("window not found for PID {0}")]
  WindowNotFound(u32),
  #[error("failed to focus window of PID {0}")]
  Refused(u32),
}

/// Capability to raise the window owned by a process.
pub trait FocusWindow {
  fn focus_window(&self, pid: u32) -> Result<(), FocusError>;
}

/// The native implementation for the current platform.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformFocus;

#[cfg(windows)]
impl FocusWindow for PlatformFocus {
  fn focus_window(&self, pid: u32) -> Result<(), FocusError> {
    win32::focus(pid)
  }
}

/// Window managers outside Windows decide focus themselves.
#[cfg(not(windows))]
impl FocusWindow for PlatformFocus {
  fn focus_window(&self, pid: u32) -> Result<(), FocusError> {
    log::debug!("Window focusing not supported here, leaving PID {} alone", pid);
    Ok(())
  }
}

#[cfg(windows)]
mod win32 {
  use windows::Win32::Foundation::{BOOL, FALSE, HWND, LPARAM, TRUE};
  use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GetClassNameW, GetWindowThreadProcessId, SetForegroundWindow, ShowWindow,
    SW_RESTORE,
  };

  use super::{FocusError, MPV_WINDOW_CLASS};

  struct Search {
    pid: u32,
    found: Option<HWND>,
  }

  unsafe extern "system" fn enum_window_callback(hwnd: HWND, lparam: LPARAM) -> BOOL {
    let search = &mut *(lparam.0 as *mut Search);

    let mut process_id = 0u32;
    GetWindowThreadProcessId(hwnd, Some(&mut process_id as *mut u32));
    if process_id != search.pid {
      return TRUE;
    }

    let mut class_name = [0u16; 256];
    let len = GetClassNameW(hwnd, &mut class_name);
    if len <= 0 {
      return TRUE;
    }
    if String::from_utf16_lossy(&class_name[..len as usize]) == MPV_WINDOW_CLASS {
      search.found = Some(hwnd);
      return FALSE;
    }
    TRUE
  }

  pub(super) fn focus(pid: u32) -> Result<(), FocusError> {
    let mut search = Search { pid, found: None };

    // Stopping early makes EnumWindows report an error; the result is in `search`.
    unsafe {
      let _ = EnumWindows(
        Some(enum_window_callback),
        LPARAM(&mut search as *mut Search as isize),
      );
    }

    let hwnd = search.found.ok_or(FocusError::WindowNotFound(pid))?;
    unsafe {
      let _ = ShowWindow(hwnd, SW_RESTORE);
      if !SetForegroundWindow(hwnd).as_bool() {
        return Err(FocusError::Refused(pid));
      }
    }
    Ok(())
  }
}
