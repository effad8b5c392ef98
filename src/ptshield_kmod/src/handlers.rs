/*
Copyright 2025 The Ptshield Authors.

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

use log::info;
use ptshield_common::command::Command;
use tracing::{Span, instrument};

use crate::Result;

/// Accept the hypervisor-call key from the caller.
#[instrument(err(Debug), skip_all, parent = Span::current(), level = "Trace")]
pub(crate) fn init(command: &Command) -> Result<()> {
    match command {
        Command::Init { vmcall_key } => {
            info!("Init called with vmcall_key={:#x}", vmcall_key);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_accepts_any_key() {
        for vmcall_key in [0, 0xdead_beef, u64::MAX] {
            assert!(init(&Command::Init { vmcall_key }).is_ok());
        }
    }
}
