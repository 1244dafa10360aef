//! Interned atoms
//!
//! ICCCM, EWMH, WindowMaker and GNUstep atoms the core reads or writes.
//! The predefined ones (WM_NAME, WM_HINTS, ...) have fixed values and live
//! in [`crate::wm::xconn::predefined`].

use anyhow::Result;

use crate::wm::xconn::{Atom, XConn};

/// Holds all interned atoms
#[derive(Debug, Clone)]
pub struct Atoms {
    // ICCCM
    pub wm_protocols: Atom,
    pub wm_delete_window: Atom,
    pub wm_take_focus: Atom,
    pub wm_save_yourself: Atom,
    pub wm_state: Atom,
    pub wm_change_state: Atom,
    pub wm_colormap_windows: Atom,
    pub wm_client_leader: Atom,
    pub utf8_string: Atom,
    // WindowMaker / GNUstep
    pub wmaker_command: Atom,
    pub wmaker_menu: Atom,
    pub wmaker_wm_miniaturize_window: Atom,
    pub gnustep_wm_attr: Atom,
    // EWMH root
    pub net_supported: Atom,
    pub net_supporting_wm_check: Atom,
    pub net_client_list: Atom,
    pub net_client_list_stacking: Atom,
    pub net_number_of_desktops: Atom,
    pub net_current_desktop: Atom,
    pub net_desktop_names: Atom,
    pub net_active_window: Atom,
    pub net_workarea: Atom,
    pub net_close_window: Atom,
    // EWMH client
    pub net_wm_name: Atom,
    pub net_wm_icon_name: Atom,
    pub net_wm_desktop: Atom,
    pub net_wm_strut: Atom,
    pub net_wm_strut_partial: Atom,
    pub net_wm_state: Atom,
    pub net_wm_state_fullscreen: Atom,
    pub net_wm_state_maximized_vert: Atom,
    pub net_wm_state_maximized_horz: Atom,
    pub net_wm_state_shaded: Atom,
    pub net_wm_state_sticky: Atom,
    pub net_wm_state_hidden: Atom,
    pub net_wm_state_skip_pager: Atom,
    pub net_wm_state_skip_taskbar: Atom,
    pub net_frame_extents: Atom,
}

impl Atoms {
    /// Intern all required atoms
    pub fn new(conn: &dyn XConn) -> Result<Self> {
        let intern = |name: &str| -> Result<Atom> { conn.intern_atom(name) };

        Ok(Self {
            wm_protocols: intern("WM_PROTOCOLS")?,
            wm_delete_window: intern("WM_DELETE_WINDOW")?,
            wm_take_focus: intern("WM_TAKE_FOCUS")?,
            wm_save_yourself: intern("WM_SAVE_YOURSELF")?,
            wm_state: intern("WM_STATE")?,
            wm_change_state: intern("WM_CHANGE_STATE")?,
            wm_colormap_windows: intern("WM_COLORMAP_WINDOWS")?,
            wm_client_leader: intern("WM_CLIENT_LEADER")?,
            utf8_string: intern("UTF8_STRING")?,
            wmaker_command: intern("_WINDOWMAKER_COMMAND")?,
            wmaker_menu: intern("_WINDOWMAKER_MENU")?,
            wmaker_wm_miniaturize_window: intern("_WINDOWMAKER_WM_MINIATURIZE_WINDOW")?,
            gnustep_wm_attr: intern("_GNUSTEP_WM_ATTR")?,
            net_supported: intern("_NET_SUPPORTED")?,
            net_supporting_wm_check: intern("_NET_SUPPORTING_WM_CHECK")?,
            net_client_list: intern("_NET_CLIENT_LIST")?,
            net_client_list_stacking: intern("_NET_CLIENT_LIST_STACKING")?,
            net_number_of_desktops: intern("_NET_NUMBER_OF_DESKTOPS")?,
            net_current_desktop: intern("_NET_CURRENT_DESKTOP")?,
            net_desktop_names: intern("_NET_DESKTOP_NAMES")?,
            net_active_window: intern("_NET_ACTIVE_WINDOW")?,
            net_workarea: intern("_NET_WORKAREA")?,
            net_close_window: intern("_NET_CLOSE_WINDOW")?,
            net_wm_name: intern("_NET_WM_NAME")?,
            net_wm_icon_name: intern("_NET_WM_ICON_NAME")?,
            net_wm_desktop: intern("_NET_WM_DESKTOP")?,
            net_wm_strut: intern("_NET_WM_STRUT")?,
            net_wm_strut_partial: intern("_NET_WM_STRUT_PARTIAL")?,
            net_wm_state: intern("_NET_WM_STATE")?,
            net_wm_state_fullscreen: intern("_NET_WM_STATE_FULLSCREEN")?,
            net_wm_state_maximized_vert: intern("_NET_WM_STATE_MAXIMIZED_VERT")?,
            net_wm_state_maximized_horz: intern("_NET_WM_STATE_MAXIMIZED_HORZ")?,
            net_wm_state_shaded: intern("_NET_WM_STATE_SHADED")?,
            net_wm_state_sticky: intern("_NET_WM_STATE_STICKY")?,
            net_wm_state_hidden: intern("_NET_WM_STATE_HIDDEN")?,
            net_wm_state_skip_pager: intern("_NET_WM_STATE_SKIP_PAGER")?,
            net_wm_state_skip_taskbar: intern("_NET_WM_STATE_SKIP_TASKBAR")?,
            net_frame_extents: intern("_NET_FRAME_EXTENTS")?,
        })
    }

    /// Atoms advertised in `_NET_SUPPORTED`
    pub fn supported(&self) -> Vec<Atom> {
        vec![
            self.net_supported,
            self.net_supporting_wm_check,
            self.net_client_list,
            self.net_client_list_stacking,
            self.net_number_of_desktops,
            self.net_current_desktop,
            self.net_desktop_names,
            self.net_active_window,
            self.net_workarea,
            self.net_close_window,
            self.net_wm_name,
            self.net_wm_icon_name,
            self.net_wm_desktop,
            self.net_wm_strut,
            self.net_wm_strut_partial,
            self.net_wm_state,
            self.net_wm_state_fullscreen,
            self.net_wm_state_maximized_vert,
            self.net_wm_state_maximized_horz,
            self.net_wm_state_shaded,
            self.net_wm_state_sticky,
            self.net_wm_state_hidden,
            self.net_frame_extents,
        ]
    }
}
