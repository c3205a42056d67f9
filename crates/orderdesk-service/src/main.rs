//! Main entry point for orderdesk.
//!
//! `orderdesk serve` runs the HTTP order endpoint. Every other subcommand is
//! an operator action run through a password-gated console session against
//! the storage selected in the configuration file.

use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use orderdesk_config::Config;
use orderdesk_core::{
	state::{available_actions, status_label},
	Action, Console, ConsoleBuilder, ConsoleFactories, Operator,
};
use orderdesk_storage::{BackendError, OrderBackend, OrderStore};
use orderdesk_types::{display_name, ConsoleEvent, IndicatorState, NewOrder, Order, OrderId, OrderStatus};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::{error::RecvError, Receiver};

mod apis;
mod server;

use orderdesk_storage::backends::{local, remote};
use orderdesk_types::ImplementationRegistry;

/// Command-line arguments for orderdesk.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml", global = true)]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info", global = true)]
	log_level: String,

	/// Console password
	#[arg(long, env = "ORDERDESK_PASSWORD", hide_env_values = true, global = true)]
	password: Option<String>,

	/// Skip the pauses around order creation
	#[arg(long, global = true)]
	no_delay: bool,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Serve the HTTP order endpoint
	Serve {
		/// Override the configured bind host
		#[arg(long)]
		host: Option<String>,
		/// Override the configured port
		#[arg(long)]
		port: Option<u16>,
	},
	/// List all orders
	List,
	/// Show one order
	Show { id: OrderId },
	/// Create an order
	Create(CreateArgs),
	/// Set the status of an order directly
	Status { id: OrderId, status: OrderStatus },
	/// Apply an operator action (accept, reject, cancel, complete)
	Action { action: Action, id: OrderId },
	/// Delete an order (local storage only)
	Delete { id: OrderId },
	/// Write all orders as JSON
	Export {
		/// Output file; stdout when omitted
		#[arg(short, long)]
		output: Option<PathBuf>,
	},
	/// Replace all orders with the contents of a JSON file
	Import { input: PathBuf },
}

#[derive(ClapArgs, Debug)]
struct CreateArgs {
	#[arg(long)]
	first_name: String,
	#[arg(long)]
	last_name: Option<String>,
	#[arg(long)]
	phone: Option<String>,
	#[arg(long)]
	telegram: String,
	#[arg(long)]
	uid: String,
	/// Description of the requested service
	#[arg(long)]
	service: Option<String>,
}

impl From<CreateArgs> for NewOrder {
	fn from(args: CreateArgs) -> Self {
		NewOrder {
			first_name: args.first_name,
			last_name: args.last_name,
			phone: args.phone,
			telegram: args.telegram,
			uid: args.uid,
			service: args.service,
		}
	}
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_writer(std::io::stderr)
		.with_target(true)
		.init();

	let config_path = args
		.config
		.to_str()
		.context("Configuration path is not valid UTF-8")?;
	let mut config = Config::from_file(config_path).await?;
	tracing::info!(path = %config_path, storage = %config.storage.primary, "Loaded configuration");

	if args.no_delay {
		config.console.create_delay_ms = 0;
		config.console.confirm_delay_ms = 0;
	}

	match args.command {
		Command::Serve { host, port } => serve(config, host, port).await,
		command => {
			let password = args
				.password
				.context("A console password is required (--password or ORDERDESK_PASSWORD)")?;
			run_console(config, &password, command).await
		},
	}
}

/// Macro to create a factory HashMap with the appropriate type aliases
macro_rules! create_factory_map {
	($interface:path, $error:path, $( $name:expr => $factory:expr ),* $(,)?) => {{
		let mut factories = HashMap::new();
		$(
			factories.insert(
				$name.to_string(),
				$factory as fn(&toml::Value) -> Result<Box<dyn $interface>, $error>
			);
		)*
		factories
	}};
}

type BackendFactory = fn(&toml::Value) -> Result<Box<dyn OrderBackend>, BackendError>;

fn backend_factories() -> ConsoleFactories<BackendFactory> {
	ConsoleFactories {
		backend_factories: create_factory_map!(
			OrderBackend,
			BackendError,
			local::Registry::NAME => local::create_backend,
			remote::Registry::NAME => remote::create_backend,
		),
	}
}

async fn serve(config: Config, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
	let mut api_config = config.api.clone().unwrap_or_default();
	if let Some(host) = host {
		api_config.host = host;
	}
	if let Some(port) = port {
		api_config.port = port;
	}
	anyhow::ensure!(api_config.enabled, "The API is disabled in the configuration");

	let store: Arc<OrderStore> = ConsoleBuilder::new(config).build_store(&backend_factories())?;

	tokio::select! {
		result = server::start_server(api_config, store) => {
			tracing::info!("API server finished");
			result?;
		}
		_ = tokio::signal::ctrl_c() => {
			tracing::info!("Shutting down");
		}
	}
	Ok(())
}

async fn run_console(config: Config, password: &str, command: Command) -> anyhow::Result<()> {
	let console = ConsoleBuilder::new(config).build(&backend_factories())?;
	let renderer = tokio::spawn(render_events(console.events().subscribe()));

	let result = match console.login(password) {
		Ok(operator) => execute(&console, &operator, command).await,
		Err(e) => Err(e.into()),
	};

	// Closing the bus ends the renderer once it has printed everything.
	drop(console);
	let _ = renderer.await;
	result
}

async fn execute(console: &Console, operator: &Operator, command: Command) -> anyhow::Result<()> {
	match command {
		Command::Serve { .. } => anyhow::bail!("serve does not run inside a console session"),
		Command::List => {
			console.refresh(operator).await?;
			let orders = console.orders(operator).await;
			if orders.is_empty() {
				println!("No orders");
			}
			for order in &orders {
				print_order(console, order);
			}
		},
		Command::Show { id } => {
			console.refresh(operator).await?;
			let order = console
				.orders(operator)
				.await
				.into_iter()
				.find(|order| order.id == id)
				.with_context(|| format!("Order {} not found", id))?;
			print_order(console, &order);
		},
		Command::Create(create) => {
			let id = console.create_order(operator, create.into()).await?;
			println!("Created order {}", id);
		},
		Command::Status { id, status } => {
			report_match(id, console.update_status(operator, id, status).await?);
		},
		Command::Action { action, id } => {
			report_match(id, console.apply_action(operator, id, action).await?);
		},
		Command::Delete { id } => {
			anyhow::ensure!(
				console.capabilities().delete,
				"The configured storage does not support deleting orders"
			);
			report_match(id, console.delete_order(operator, id).await?);
		},
		Command::Export { output } => {
			anyhow::ensure!(
				console.capabilities().export,
				"The configured storage does not support exporting orders"
			);
			let json = console.export(operator).await?;
			match output {
				Some(path) => {
					tokio::fs::write(&path, json)
						.await
						.with_context(|| format!("Cannot write {}", path.display()))?;
					println!("Exported to {}", path.display());
				},
				None => println!("{}", json),
			}
		},
		Command::Import { input } => {
			anyhow::ensure!(
				console.capabilities().import,
				"The configured storage does not support importing orders"
			);
			let json = tokio::fs::read_to_string(&input)
				.await
				.with_context(|| format!("Cannot read {}", input.display()))?;
			let count = console.import(operator, &json).await?;
			println!("Imported {} orders", count);
		},
	}
	Ok(())
}

fn report_match(id: OrderId, matched: bool) {
	if !matched {
		println!("No order with id {}", id);
	}
}

fn print_order(console: &Console, order: &Order) {
	println!(
		"#{}  {}  {}  UID {}",
		order.id,
		display_name(&order.first_name, order.last_name.as_deref()),
		order.telegram,
		order.uid
	);
	if let Some(phone) = &order.phone {
		println!("    phone: {}", phone);
	}
	if let Some(service) = &order.service {
		println!("    service: {}", service);
	}
	println!(
		"    {}  created {}  updated {}",
		status_label(order.status),
		console.format_time(&order.created_at),
		console.format_time(&order.updated_at)
	);

	let actions = available_actions(order.status);
	if !actions.is_empty() {
		let names: Vec<String> = actions.iter().map(|action| action.to_string()).collect();
		println!("    actions: {}", names.join(", "));
	}
}

/// Prints notices and indicator messages until the bus closes.
async fn render_events(mut events: Receiver<ConsoleEvent>) {
	loop {
		match events.recv().await {
			Ok(ConsoleEvent::Notice(notice)) => eprintln!("{}: {}", notice.title, notice.message),
			Ok(ConsoleEvent::Indicator(IndicatorState::Open(message))) => eprintln!("{}", message),
			Ok(event) => tracing::debug!(?event, "Console event"),
			Err(RecvError::Lagged(skipped)) => {
				tracing::warn!(skipped, "Console events dropped");
			},
			Err(RecvError::Closed) => break,
		}
	}
}
