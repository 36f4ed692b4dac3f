//! Low-level commands used to drive the browse session.

/// A request the integration sends directly to the device.
///
/// Most control goes through the typed methods on
/// [`NaimDevice`](crate::NaimDevice); these are the primitives the media
/// browser needs to step through the device's menu.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Command {
    /// Go up one level in the current browse list
    BrowseParent,
    /// Switch the device's view into browse mode
    SetViewStateBrowse,
    /// Ask the NVM processor for its view state
    NvmGetViewState,
    /// Ask the controller for its view state
    GetViewState,
    /// Fetch the header of the active browse list
    GetActiveList,
    /// Fetch rows `from..=to` of a list
    GetRows { list_handle: u32, from: u32, to: u32 },
}

impl Command {
    /// Command name as used by the device library.
    pub fn name(&self) -> &'static str {
        match self {
            Command::BrowseParent => "BROWSEPARENT",
            Command::SetViewStateBrowse => "SETVIEWSTATE BROWSE",
            Command::NvmGetViewState => "GETVIEWSTATE",
            Command::GetViewState => "GetViewState",
            Command::GetActiveList => "GetActiveList",
            Command::GetRows { .. } => "GetRows",
        }
    }

    /// NVM commands go to the device's NVM processor, the rest to its controller.
    pub fn is_nvm(&self) -> bool {
        matches!(
            self,
            Command::BrowseParent | Command::SetViewStateBrowse | Command::NvmGetViewState
        )
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::GetRows { list_handle, from, to } => {
                write!(f, "GetRows(list_handle={}, from={}, to={})", list_handle, from, to)
            }
            other => f.write_str(other.name()),
        }
    }
}
