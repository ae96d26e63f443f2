//! Nitro client: entry point.
//!
//! Each subcommand plays one screen of the marketplace app against the
//! REST backend. `nitro shell` keeps one process (and so one tab-scoped
//! session) alive across many commands.

mod accessors;
mod auth;
mod config;
mod errors;
mod export;
mod fanout;
mod guard;
mod http;
mod identity;
mod oauth;
mod session;
mod storage;
mod tracker;
mod views;

#[cfg(test)]
mod testing;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use nitro_core::routing::{decide, Area, ProtectedRoute};
use nitro_core::validation::{validate_feedback, validate_payment_details, validate_review};
use nitro_core::{
    ApplicationStatus, ApprovalStatus, GuardState, Navigation, PaymentDetails, PayoutStatus,
    ProjectMode, ProjectStatus, Role, Session, User,
};
use reqwest::Client;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdin};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use accessors::allocations::{FeedbackDraft, ProofUpload, ReviewDraft};
use accessors::projects::{NewProject, ProjectFilter};
use accessors::verification::Decision;
use accessors::{allocations, notifications, payouts, projects, users, verification};
use config::Config;
use errors::{AuthFailureKind, ClientError};
use http::{cancellable, ApiClient};
use identity::IdentityProvider;
use session::{SessionContext, SessionState};
use storage::{DurableStore, TabStore};
use tracker::TrackingBoard;

// ─────────────────────────────────────────────────────────
// Command line
// ─────────────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(name = "nitro", version, about = "Nitro sampling marketplace client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign in with email and password
    Login {
        email: String,
        #[arg(long, env = "NITRO_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Keep the session after this process exits
        #[arg(long)]
        remember: bool,
    },
    /// Create an account
    Signup {
        email: String,
        #[arg(long, env = "NITRO_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        #[arg(long)]
        confirm: Option<String>,
    },
    /// Re-send the signup confirmation email
    Resend { email: String },
    Logout,
    /// Sign in through an OAuth provider
    Oauth {
        #[arg(long, default_value = "google")]
        provider: String,
        /// Redirect URL pasted from the browser, instead of the loopback listener
        #[arg(long)]
        redirect: Option<String>,
        #[arg(long)]
        remember: bool,
    },
    Whoami,
    /// Resolve a page path through the route guard
    Open { path: String },
    Dashboard,
    /// Browse published campaigns
    Catalog {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        mode: Option<String>,
    },
    /// Ask for access to a campaign's products
    RequestAccess {
        project_id: String,
        /// Show the current request instead of creating one
        #[arg(long)]
        status: bool,
    },
    /// Apply for one or more products of a campaign
    Apply {
        project_id: String,
        #[arg(required = true)]
        product_ids: Vec<String>,
    },
    /// Track allocations (all, or one by id)
    Allocations { allocation_id: Option<String> },
    ConfirmPurchase {
        allocation_id: String,
        /// Not purchased yet; stop asking
        #[arg(long)]
        not_yet: bool,
    },
    UploadInvoice {
        allocation_id: String,
        file: PathBuf,
        #[arg(long)]
        product: Option<String>,
    },
    SubmitReview {
        allocation_id: String,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        text: Option<String>,
        #[arg(long)]
        product: Option<String>,
        #[arg(long = "screenshot")]
        screenshots: Vec<String>,
    },
    SubmitFeedback {
        allocation_id: String,
        #[arg(long)]
        rating: u8,
        #[arg(long)]
        text: String,
    },
    #[command(subcommand)]
    PaymentDetails(PaymentDetailsCommand),
    #[command(subcommand)]
    Payouts(PayoutsCommand),
    #[command(subcommand)]
    Verify(VerifyCommand),
    #[command(subcommand)]
    Applications(ApplicationsCommand),
    #[command(subcommand)]
    AccessRequests(AccessRequestsCommand),
    #[command(subcommand)]
    Brand(BrandCommand),
    #[command(subcommand)]
    Users(UsersCommand),
    Notifications {
        #[arg(long)]
        mark_read: Vec<String>,
    },
    /// Run commands interactively in one process
    Shell,
}

#[derive(Debug, Subcommand)]
enum PaymentDetailsCommand {
    Show,
    Save(PaymentDetailsArgs),
}

#[derive(Debug, Args)]
struct PaymentDetailsArgs {
    #[arg(long)]
    address_line1: String,
    #[arg(long)]
    address_line2: Option<String>,
    #[arg(long)]
    city: String,
    #[arg(long)]
    state: String,
    #[arg(long)]
    pincode: String,
    #[arg(long)]
    bank_account_number: String,
    #[arg(long)]
    ifsc: String,
}

impl From<PaymentDetailsArgs> for PaymentDetails {
    fn from(args: PaymentDetailsArgs) -> Self {
        Self {
            address_line1: args.address_line1,
            address_line2: args.address_line2,
            city: args.city,
            state: args.state,
            pincode: args.pincode,
            bank_account_number: args.bank_account_number,
            ifsc: args.ifsc.to_ascii_uppercase(),
        }
    }
}

#[derive(Debug, Subcommand)]
enum PayoutsCommand {
    /// Your own payouts
    Mine,
    List {
        #[arg(long, value_enum)]
        status: Option<PayoutStatusArg>,
    },
    /// Batch the given payouts (default: every eligible one)
    Batch { payout_ids: Vec<String> },
    Batches,
    MarkPaid {
        #[arg(required = true)]
        payout_ids: Vec<String>,
    },
    /// Download a batch as CSV
    Export { batch_id: String },
}

#[derive(Debug, Subcommand)]
enum VerifyCommand {
    Proofs {
        #[arg(long, value_enum, default_value_t = StatusArg::Pending)]
        status: StatusArg,
    },
    Reviews {
        #[arg(long, value_enum, default_value_t = StatusArg::Pending)]
        status: StatusArg,
    },
    Decide {
        #[arg(value_enum)]
        kind: SubmissionKind,
        id: String,
        #[command(flatten)]
        decision: DecisionArgs,
    },
}

#[derive(Debug, Subcommand)]
enum ApplicationsCommand {
    List {
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
    },
    Decide {
        application_id: String,
        #[command(flatten)]
        decision: DecisionArgs,
    },
}

#[derive(Debug, Subcommand)]
enum AccessRequestsCommand {
    List {
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
    },
    Decide {
        request_id: String,
        #[command(flatten)]
        decision: DecisionArgs,
    },
}

#[derive(Debug, Subcommand)]
enum BrandCommand {
    Projects,
    /// Create a campaign from a JSON file
    Create { file: PathBuf },
    Publish { project_id: String },
    Archive { project_id: String },
}

#[derive(Debug, Subcommand)]
enum UsersCommand {
    List {
        #[arg(long, value_enum)]
        role: Option<RoleArg>,
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
    },
    Approve { user_id: String },
    Reject { user_id: String },
}

#[derive(Debug, Args)]
struct DecisionArgs {
    #[arg(long, conflicts_with = "reject")]
    approve: bool,
    #[arg(long, value_name = "REASON")]
    reject: Option<String>,
}

impl DecisionArgs {
    fn into_decision(self) -> anyhow::Result<Decision> {
        match (self.approve, self.reject) {
            (_, Some(reason)) if reason.trim().is_empty() => bail!("A rejection needs a reason"),
            (_, Some(reason)) => Ok(Decision::reject(reason)),
            (true, None) => Ok(Decision::approve()),
            (false, None) => bail!("Pass --approve or --reject <REASON>"),
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SubmissionKind {
    Proof,
    Review,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StatusArg {
    Pending,
    Approved,
    Rejected,
}

impl From<StatusArg> for ApprovalStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Pending => Self::Pending,
            StatusArg::Approved => Self::Approved,
            StatusArg::Rejected => Self::Rejected,
        }
    }
}

impl From<StatusArg> for ApplicationStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Pending => Self::Pending,
            StatusArg::Approved => Self::Approved,
            StatusArg::Rejected => Self::Rejected,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PayoutStatusArg {
    Eligible,
    InBatch,
    Exported,
    Paid,
}

impl From<PayoutStatusArg> for PayoutStatus {
    fn from(arg: PayoutStatusArg) -> Self {
        match arg {
            PayoutStatusArg::Eligible => Self::Eligible,
            PayoutStatusArg::InBatch => Self::InBatch,
            PayoutStatusArg::Exported => Self::Exported,
            PayoutStatusArg::Paid => Self::Paid,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RoleArg {
    Admin,
    SuperAdmin,
    Participant,
    Brand,
}

impl From<RoleArg> for Role {
    fn from(arg: RoleArg) -> Self {
        match arg {
            RoleArg::Admin => Self::Admin,
            RoleArg::SuperAdmin => Self::SuperAdmin,
            RoleArg::Participant => Self::Participant,
            RoleArg::Brand => Self::Brand,
        }
    }
}

// ─────────────────────────────────────────────────────────
// Application
// ─────────────────────────────────────────────────────────

struct App {
    config: Config,
    api: ApiClient,
    identity: IdentityProvider,
    input: Mutex<BufReader<Stdin>>,
}

impl App {
    async fn connect(config: Config) -> anyhow::Result<Self> {
        let mut builder = Client::builder();
        if config.request_timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.request_timeout_secs));
        }
        let client = builder.build()?;

        let store = DurableStore::open(&config.store_url).await?;
        let session = Arc::new(SessionContext::new(store, TabStore::new()));
        let api = ApiClient::new(client.clone(), &config.api_url, session);
        let identity = IdentityProvider::new(client, &config.auth_url, &config.auth_key);
        info!("Using backend {}", config.api_url);

        Ok(Self {
            config,
            api,
            identity,
            input: Mutex::new(BufReader::new(tokio::io::stdin())),
        })
    }

    /// Print a notice whenever the backend ends the session.
    fn watch_session(&self) {
        let mut events = self.api.session().subscribe();
        tokio::spawn(async move {
            while events.changed().await.is_ok() {
                let state = events.borrow_and_update().clone();
                if let SessionState::Expired { redirect } = state {
                    eprintln!("Your session has expired ({redirect}). Run `nitro login` to continue.");
                }
            }
        });
    }

    async fn read_line(&self, label: &str) -> anyhow::Result<Option<String>> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(label.as_bytes()).await?;
        stdout.flush().await?;

        let mut line = String::new();
        let read = self.input.lock().await.read_line(&mut line).await?;
        Ok((read > 0).then(|| line.trim_end_matches(['\r', '\n']).to_string()))
    }

    async fn prompt(&self, label: &str) -> anyhow::Result<String> {
        self.read_line(label)
            .await?
            .ok_or_else(|| anyhow!("No input for {}", label.trim_end_matches(": ")))
    }

    /// Re-verify the stored session against the backend.
    async fn signed_in(&self) -> anyhow::Result<User> {
        let Some(token) = self.api.session().token().await? else {
            bail!("Not signed in. Run `nitro login <email>` first.");
        };
        match auth::verify_session(&self.api, None).await {
            Ok(user) => {
                self.api.session().establish(Session::new(token, &user));
                Ok(user)
            }
            Err(e) => {
                self.api.session().clear().await?;
                bail!("Your session is no longer valid ({e}). Run `nitro login` again.")
            }
        }
    }

    /// Signed-in user allowed into `area`.
    async fn require(&self, area: Area) -> anyhow::Result<User> {
        let user = self.signed_in().await?;
        let route = ProtectedRoute {
            area,
            owner_id: Some(user.id.clone()),
        };
        match decide(&route, &user) {
            GuardState::Granted => Ok(user),
            _ => bail!("This command is not available to {} accounts", user.role),
        }
    }

    /// Run one command; Ctrl-C cancels it.
    async fn run(&self, command: Command) -> anyhow::Result<()> {
        let cancel = CancellationToken::new();
        let interrupt = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            }
        });

        let result = tokio::select! {
            result = self.execute(command, &cancel) => result,
            _ = cancel.cancelled() => Err(ClientError::Cancelled.into()),
        };
        interrupt.abort();
        result
    }

    async fn shell(&self) -> anyhow::Result<()> {
        println!("Nitro shell. Type `help` for commands, `exit` to leave.");
        while let Some(line) = self.read_line("nitro> ").await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if matches!(line, "exit" | "quit") {
                break;
            }

            let command = match parse_shell_line(line) {
                Ok(command) => command,
                Err(ShellLineError::Quoting) => {
                    eprintln!("Error: unbalanced quotes");
                    continue;
                }
                Err(ShellLineError::Cli(e)) => {
                    let _ = e.print();
                    continue;
                }
            };
            if let Err(e) = self.run(command).await {
                eprintln!("Error: {e:#}");
            }
        }
        Ok(())
    }

    async fn execute(&self, command: Command, cancel: &CancellationToken) -> anyhow::Result<()> {
        let api = &self.api;
        match command {
            // ── Session ──────────────────────────────────
            Command::Login { email, password, remember } => {
                let password = match password {
                    Some(p) => p,
                    None => self.prompt("Password: ").await?,
                };
                match auth::login(&self.identity, api, &email, &password, remember).await {
                    Ok(user) => {
                        println!("Signed in as {}", views::whoami(&user));
                        if !remember {
                            println!("This session ends with the process; use --remember or `nitro shell`.");
                        }
                    }
                    Err(ClientError::Auth(f)) if f.kind == AuthFailureKind::EmailNotConfirmed => {
                        bail!("{}. Run `nitro resend {email}` for a new confirmation link.", f.message)
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Command::Signup { email, password, confirm } => {
                let password = match password {
                    Some(p) => p,
                    None => self.prompt("Password: ").await?,
                };
                let confirm = match confirm {
                    Some(c) => c,
                    None => self.prompt("Confirm password: ").await?,
                };
                let store = api.session().durable();
                let outcome = auth::signup(
                    &self.identity,
                    store,
                    self.config.signup_cooldown_secs,
                    &email,
                    &password,
                    &confirm,
                    Utc::now(),
                )
                .await;
                match outcome {
                    Ok(()) => println!("Account created. Check {email} for a confirmation link."),
                    Err(ClientError::Auth(f))
                        if matches!(f.kind, AuthFailureKind::RateLimited | AuthFailureKind::CoolingDown) =>
                    {
                        let wait = f.retry_after.unwrap_or(self.config.signup_cooldown_secs);
                        bail!("{} (try again in {wait}s)", f.message)
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Command::Resend { email } => {
                auth::resend_confirmation(&self.identity, &email).await?;
                println!("Confirmation email sent to {email}.");
            }
            Command::Logout => {
                auth::logout(&self.identity, api).await?;
                println!("Signed out.");
            }
            Command::Oauth { provider, redirect, remember } => {
                let token = match redirect {
                    Some(url) => {
                        info!("Using pasted redirect {}", identity::strip_fragment(&url));
                        identity::token_from_redirect(&url)?
                    }
                    None => {
                        let listener = oauth::bind(self.config.oauth_port).await?;
                        let url = self.identity.authorize_url(&provider, listener.redirect_url())?;
                        println!("Open this URL to sign in:\n{url}");
                        listener.wait_for_token(cancel).await?
                    }
                };
                let user = auth::adopt_token(api, &token, remember).await?;
                println!("Signed in as {}", views::whoami(&user));
            }
            Command::Whoami => {
                let user = self.signed_in().await?;
                println!("{}", views::whoami(&user));
            }
            Command::Open { path } => {
                let state = guard::check(api, &path).await?;
                match state.navigation(&path) {
                    Navigation::Render(page) => println!("{page}"),
                    Navigation::Redirect(to) => println!("Redirected to {to}"),
                    Navigation::Loading => println!("Loading..."),
                }
            }

            // ── Participant ──────────────────────────────
            Command::Dashboard => {
                let user = self.require(Area::Participant).await?;
                let dashboard = cancellable(
                    cancel,
                    tracker::load_dashboard(api, &user.id, self.config.aggregate_timeout_secs, Utc::now()),
                )
                .await?;
                println!("{}", views::dashboard(&user, &dashboard));
            }
            Command::Catalog { search, mode } => {
                self.require(Area::Participant).await?;
                let filter = ProjectFilter {
                    search,
                    mode: mode.map(ProjectMode::from),
                    ..ProjectFilter::default()
                };
                let (listed, applied) = tokio::join!(
                    projects::list_projects(api, &filter),
                    projects::my_applications(api)
                );
                let applied = applied.unwrap_or_else(|e| {
                    warn!("Applications unavailable, showing catalog without them: {e}");
                    Vec::new()
                });
                println!("{}", views::catalog(&listed?, &applied));
            }
            Command::RequestAccess { project_id, status } => {
                self.require(Area::Participant).await?;
                if status {
                    let request = projects::my_access_request(api, &project_id).await?;
                    println!("{}", views::access_request(request.as_ref()));
                } else {
                    match projects::request_access(api, &project_id).await {
                        Ok(request) => println!("{}", views::access_request(Some(&request))),
                        Err(e) if e.is_already_pending() => println!("Access already requested."),
                        Err(e) => return Err(e.into()),
                    }
                }
            }
            Command::Apply { project_id, product_ids } => {
                self.require(Area::Participant).await?;
                let details = users::payment_details(api).await?;
                let report = fanout::apply_to_products(api, &project_id, &product_ids, details.as_ref()).await?;
                println!("{}", views::report(&report));
            }
            Command::Allocations { allocation_id } => {
                let user = self.require(Area::Participant).await?;
                let board = match allocation_id {
                    Some(id) => TrackingBoard {
                        items: vec![cancellable(cancel, tracker::load_one(api, &user.id, &id, Utc::now())).await?],
                        error: None,
                    },
                    None => cancellable(cancel, tracker::load_board(api, &user.id, Utc::now())).await?,
                };
                println!("{}", views::board(&board));
            }
            Command::ConfirmPurchase { allocation_id, not_yet } => {
                let user = self.require(Area::Participant).await?;
                if not_yet {
                    tracker::dismiss_prompt(api, &user.id, &allocation_id).await?;
                    println!("Okay, we will not ask again about {allocation_id}.");
                } else {
                    let outcome = tracker::confirm_purchase(api, &user.id, &allocation_id).await?;
                    println!("Marked {allocation_id} as purchased.");
                    if let Some(warning) = outcome.warning {
                        println!("Warning: {warning}");
                    }
                }
            }
            Command::UploadInvoice { allocation_id, file, product } => {
                self.require(Area::Participant).await?;
                let upload = ProofUpload::from_path(&allocation_id, product.as_deref(), &file).await?;
                let proof = allocations::upload_purchase_proof(api, upload).await?;
                println!("Invoice uploaded ({}).", proof.status.as_str());
            }
            Command::SubmitReview { allocation_id, url, text, product, screenshots } => {
                self.require(Area::Participant).await?;
                validate_review(url.as_deref(), text.as_deref())?;
                let draft = ReviewDraft {
                    product_id: product,
                    review_url: url,
                    review_text: text,
                    screenshots,
                };
                let review = allocations::submit_review(api, &allocation_id, &draft).await?;
                println!("Review submitted ({}).", review.status.as_str());
            }
            Command::SubmitFeedback { allocation_id, rating, text } => {
                self.require(Area::Participant).await?;
                validate_feedback(rating, &text)?;
                let draft = FeedbackDraft { rating, feedback: text };
                allocations::submit_feedback(api, &allocation_id, &draft).await?;
                println!("Feedback submitted.");
            }
            Command::PaymentDetails(PaymentDetailsCommand::Show) => {
                self.require(Area::Participant).await?;
                let details = users::payment_details(api).await?;
                println!("{}", views::payment_details(details.as_ref()));
            }
            Command::PaymentDetails(PaymentDetailsCommand::Save(args)) => {
                self.require(Area::Participant).await?;
                let details = PaymentDetails::from(args);
                validate_payment_details(&details)?;
                let saved = users::save_payment_details(api, &details).await?;
                println!("Saved.\n{}", views::payment_details(Some(&saved)));
            }
            Command::Payouts(command) => {
                let area = match command {
                    PayoutsCommand::Mine => Area::Participant,
                    _ => Area::Admin,
                };
                self.require(area).await?;
                self.payouts(command).await?;
            }

            // ── Admin ────────────────────────────────────
            Command::Verify(command) => {
                self.require(Area::Admin).await?;
                match command {
                    VerifyCommand::Proofs { status } => {
                        let list = verification::purchase_proofs(api, status.into()).await?;
                        println!("{}", views::purchase_proofs(&list));
                    }
                    VerifyCommand::Reviews { status } => {
                        let list = verification::reviews(api, status.into()).await?;
                        println!("{}", views::reviews(&list));
                    }
                    VerifyCommand::Decide { kind, id, decision } => {
                        let decision = decision.into_decision()?;
                        let status = match kind {
                            SubmissionKind::Proof => verification::decide_purchase_proof(api, &id, &decision).await?.status,
                            SubmissionKind::Review => verification::decide_review(api, &id, &decision).await?.status,
                        };
                        println!("{id}: {}", status.as_str());
                    }
                }
            }
            Command::Applications(command) => {
                self.require(Area::Admin).await?;
                match command {
                    ApplicationsCommand::List { status } => {
                        let list = projects::list_applications(api, status.map(Into::into)).await?;
                        println!("{}", views::applications(&list));
                    }
                    ApplicationsCommand::Decide { application_id, decision } => {
                        let decision = decision.into_decision()?;
                        let application = projects::decide_application(
                            api,
                            &application_id,
                            decision.status,
                            decision.reason.as_deref(),
                        )
                        .await?;
                        println!("{application_id}: {}", application.status.as_str());
                    }
                }
            }
            Command::AccessRequests(command) => {
                self.require(Area::Admin).await?;
                match command {
                    AccessRequestsCommand::List { status } => {
                        let list = projects::list_access_requests(api, status.map(Into::into)).await?;
                        println!("{}", views::access_requests(&list));
                    }
                    AccessRequestsCommand::Decide { request_id, decision } => {
                        let decision = decision.into_decision()?;
                        let request = projects::decide_access_request(api, &request_id, decision.status).await?;
                        println!("{request_id}: {}", request.status.as_str());
                    }
                }
            }
            Command::Users(command) => {
                self.require(Area::SuperAdmin).await?;
                match command {
                    UsersCommand::List { role, status } => {
                        let list = users::list_users(api, role.map(Into::into), status.map(Into::into)).await?;
                        println!("{}", views::users(&list));
                    }
                    UsersCommand::Approve { user_id } => {
                        users::set_approval(api, &user_id, ApprovalStatus::Approved).await?;
                        println!("{user_id}: APPROVED");
                    }
                    UsersCommand::Reject { user_id } => {
                        users::set_approval(api, &user_id, ApprovalStatus::Rejected).await?;
                        println!("{user_id}: REJECTED");
                    }
                }
            }

            // ── Brand ────────────────────────────────────
            Command::Brand(command) => {
                self.require(Area::Brand).await?;
                match command {
                    BrandCommand::Projects => {
                        println!("{}", views::projects(&projects::brand_projects(api).await?));
                    }
                    BrandCommand::Create { file } => {
                        let raw = tokio::fs::read_to_string(&file)
                            .await
                            .with_context(|| format!("Reading {}", file.display()))?;
                        let draft: NewProject = serde_json::from_str(&raw)
                            .with_context(|| format!("Parsing {}", file.display()))?;
                        let project = projects::create_project(api, &draft).await?;
                        println!("Created {} ({})", project.id, project.status.as_str());
                    }
                    BrandCommand::Publish { project_id } => {
                        let project = projects::set_project_status(api, &project_id, ProjectStatus::Published).await?;
                        println!("{}: {}", project.id, project.status.as_str());
                    }
                    BrandCommand::Archive { project_id } => {
                        let project = projects::set_project_status(api, &project_id, ProjectStatus::Archived).await?;
                        println!("{}: {}", project.id, project.status.as_str());
                    }
                }
            }

            // ── Any role ─────────────────────────────────
            Command::Notifications { mark_read } => {
                self.signed_in().await?;
                if mark_read.is_empty() {
                    println!("{}", views::notifications(&notifications::list(api).await?));
                } else {
                    for id in &mark_read {
                        notifications::mark_read(api, id).await?;
                    }
                    println!("Marked {} read.", mark_read.len());
                }
            }
            Command::Shell => println!("Already in the shell."),
        }
        Ok(())
    }

    async fn payouts(&self, command: PayoutsCommand) -> anyhow::Result<()> {
        let api = &self.api;
        match command {
            PayoutsCommand::Mine => {
                println!("{}", views::payouts(&payouts::my_payouts(api).await?));
            }
            PayoutsCommand::List { status } => {
                let list = payouts::list_payouts(api, status.map(Into::into)).await?;
                println!("{}", views::payouts(&list));
            }
            PayoutsCommand::Batch { payout_ids } => {
                let ids = if payout_ids.is_empty() {
                    payouts::list_payouts(api, Some(PayoutStatus::Eligible))
                        .await?
                        .into_iter()
                        .map(|p| p.id)
                        .collect()
                } else {
                    payout_ids
                };
                if ids.is_empty() {
                    bail!("No eligible payouts to batch");
                }
                let batch = payouts::create_batch(api, &ids).await?;
                println!("{}", views::batches(std::slice::from_ref(&batch)));
            }
            PayoutsCommand::Batches => {
                println!("{}", views::batches(&payouts::list_batches(api).await?));
            }
            PayoutsCommand::MarkPaid { payout_ids } => {
                let report = fanout::mark_payouts_paid(api, &payout_ids).await?;
                println!("{}", views::report(&report));
            }
            PayoutsCommand::Export { batch_id } => {
                let path = export::export_batch_csv(api, &batch_id, &self.config.export_dir, Utc::now().date_naive()).await?;
                println!("Saved {}", path.display());
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
enum ShellLineError {
    Quoting,
    Cli(clap::Error),
}

/// Split a shell line the way a POSIX shell would and parse it as a command.
fn parse_shell_line(line: &str) -> Result<Command, ShellLineError> {
    let words = shlex::split(line).ok_or(ShellLineError::Quoting)?;
    let args = std::iter::once("nitro".to_string()).chain(words);
    Cli::try_parse_from(args)
        .map(|cli| cli.command)
        .map_err(ShellLineError::Cli)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the screens.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = Config::from_env().map_err(|e| anyhow!("{e}"))?;
    let app = App::connect(config).await?;
    app.watch_session();

    match cli.command {
        Command::Shell => app.shell().await,
        command => app.run(command).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn shell_lines_parse_like_arguments() {
        let cli = Cli::try_parse_from(["nitro", "payouts", "mark-paid", "p1", "p2"]).unwrap();
        match cli.command {
            Command::Payouts(PayoutsCommand::MarkPaid { payout_ids }) => {
                assert_eq!(payout_ids, vec!["p1", "p2"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn shell_keeps_quoted_values_together() {
        let command = parse_shell_line(r#"submit-feedback a1 --rating 5 --text "Great product""#).unwrap();
        match command {
            Command::SubmitFeedback { allocation_id, rating, text } => {
                assert_eq!(allocation_id, "a1");
                assert_eq!(rating, 5);
                assert_eq!(text, "Great product");
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let command = parse_shell_line("verify decide proof pp1 --reject 'Blurry photo'").unwrap();
        let Command::Verify(VerifyCommand::Decide { decision, .. }) = command else {
            panic!("expected verify decide");
        };
        assert_eq!(decision.reject.as_deref(), Some("Blurry photo"));

        assert!(matches!(
            parse_shell_line(r#"submit-feedback a1 --rating 5 --text "Great"#),
            Err(ShellLineError::Quoting)
        ));
    }

    #[test]
    fn decisions_need_exactly_one_verdict() {
        let cli = Cli::try_parse_from(["nitro", "verify", "decide", "review", "r1", "--reject", "Blurry"]).unwrap();
        let Command::Verify(VerifyCommand::Decide { decision, .. }) = cli.command else {
            panic!("expected verify decide");
        };
        let decision = decision.into_decision().unwrap();
        assert_eq!(decision.status, ApprovalStatus::Rejected);
        assert_eq!(decision.reason.as_deref(), Some("Blurry"));

        let neither = DecisionArgs { approve: false, reject: None };
        assert!(neither.into_decision().is_err());
        assert!(Cli::try_parse_from(["nitro", "applications", "decide", "a1", "--approve", "--reject", "x"]).is_err());
    }
}
