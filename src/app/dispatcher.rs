//! Button-driven session commands
//!
//! Each button edge maps to exactly one service call. The dispatcher remembers the
//! last client it accepted so that later commands can target it.

use crate::console::LogConsole;
use crate::controller::{Button, ButtonSet, InputSource};
use crate::dlp::{ConnectingClients, DistributionServer, NodeId};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Help shown when the input loop starts
const HELP: [&str; 6] = [
    "Press A to start distribution",
    "Press B to reboot all clients",
    "Press X to accept all connecting clients",
    "Press Y to disconnect the last client",
    "Press L to show info of the last client",
    "Press HOME to exit",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    StartDistribution,
    RebootAllClients,
    AcceptConnectingClients,
    DisconnectLastClient,
    ShowLastClientState,
}

impl Command {
    /// Commands in the order they are handled within one frame
    pub const ALL: [Command; 5] = [
        Command::StartDistribution,
        Command::RebootAllClients,
        Command::AcceptConnectingClients,
        Command::DisconnectLastClient,
        Command::ShowLastClientState,
    ];

    pub fn button(self) -> Button {
        match self {
            Command::StartDistribution => Button::A,
            Command::RebootAllClients => Button::B,
            Command::AcceptConnectingClients => Button::X,
            Command::DisconnectLastClient => Button::Y,
            Command::ShowLastClientState => Button::L,
        }
    }
}

pub struct CommandDispatcher {
    server: Arc<dyn DistributionServer>,
    console: LogConsole,
    last_node_id: NodeId,
}

impl CommandDispatcher {
    pub fn new(server: Arc<dyn DistributionServer>, console: LogConsole) -> Self {
        Self {
            server,
            console,
            last_node_id: NodeId::default(),
        }
    }

    /// Client targeted by disconnect and state queries
    pub fn last_node_id(&self) -> NodeId {
        self.last_node_id
    }

    /// Runs the command of every triggered button, returns how many ran
    pub fn dispatch(&mut self, triggers: ButtonSet) -> usize {
        let mut executed = 0;
        for command in Command::ALL {
            if triggers.contains(command.button()) {
                self.execute(command);
                executed += 1;
            }
        }
        executed
    }

    pub fn execute(&mut self, command: Command) {
        debug!("Executing {:?}", command);
        match command {
            Command::StartDistribution => self.start_distribution(),
            Command::RebootAllClients => self.reboot_all_clients(),
            Command::AcceptConnectingClients => self.accept_connecting_clients(),
            Command::DisconnectLastClient => self.disconnect_last_client(),
            Command::ShowLastClientState => self.show_last_client_state(),
        }
    }

    fn start_distribution(&self) {
        match self.server.start_distribution() {
            Ok(()) => self
                .console
                .print("Started distribution! Press B to reboot all clients"),
            Err(code) => self.console.print_failure("StartDistribution", code),
        }
    }

    fn reboot_all_clients(&self) {
        match self.server.reboot_all_clients() {
            Ok(()) => self.console.print("Rebooted all clients!"),
            Err(code) => self.console.print_failure("RebootAllClients", code),
        }
    }

    // The list holds accepted clients too; accepting them again is harmless.
    fn accept_connecting_clients(&mut self) {
        let clients = match ConnectingClients::fetch(self.server.as_ref()) {
            Ok(clients) => clients,
            Err(code) => {
                self.console.print_failure("GetConnectingClients", code);
                return;
            }
        };

        for node in clients.iter() {
            self.console.print(format!("Accepting node ID {}", node));
            match self.server.accept_client(node) {
                Ok(()) => self.last_node_id = node,
                Err(code) => self.console.print_failure("AcceptClient", code),
            }
        }

        self.console.print("Nodes accepted!");
    }

    fn disconnect_last_client(&self) {
        let node = self.last_node_id;
        match self.server.disconnect_client(node) {
            Ok(()) => self.console.print(format!("Disconnected node ID {}", node)),
            Err(code) => self
                .console
                .print_failure(&format!("DisconnectClient({})", node), code),
        }
    }

    fn show_last_client_state(&self) {
        let node = self.last_node_id;
        match self.server.get_client_state(node) {
            Ok(progress) => self.console.print(format!(
                "Node ID: {}, Client state: {}, unitsTotal: {}, unitsReceived: {}",
                node, progress.state, progress.units_total, progress.units_received
            )),
            Err(code) => self.console.print_failure("GetClientState", code),
        }
    }
}

/// Reads the gamepad and dispatches commands until shutdown is requested
///
/// The console is repainted to `screen` once per iteration. HOME requests shutdown
/// for the whole demo.
pub fn run_input_loop(
    input: &mut dyn InputSource,
    dispatcher: &mut CommandDispatcher,
    console: &LogConsole,
    shutdown: &CancellationToken,
    exit_linger: Duration,
    screen: &mut dyn Write,
) {
    info!("Starting input loop");
    for line in HELP {
        console.print(line);
    }

    while !shutdown.is_cancelled() {
        match input.poll_triggers() {
            Ok(triggers) => {
                dispatcher.dispatch(triggers);
                if triggers.contains(Button::Home) {
                    info!("HOME pressed, requesting shutdown");
                    shutdown.cancel();
                }
            }
            Err(e) => warn!("Skipping frame: {}", e),
        }

        repaint(console, screen);
    }

    console.print("Exiting... good bye.");
    repaint(console, screen);
    std::thread::sleep(exit_linger);
    info!("Input loop finished");
}

pub(crate) fn repaint(console: &LogConsole, screen: &mut dyn Write) {
    let mut screen = screen;
    if let Err(e) = console.draw(&mut screen) {
        warn!("Failed to draw console: {}", e);
    }
}
