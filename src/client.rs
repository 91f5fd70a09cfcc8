use crate::{
    catalog::{
        CatalogClient,
        PokemonMetadata,
        SpeciesMetadata,
    },
    profiles::{
        self,
        Profile,
        ProfileDescriptor,
    },
    reaction::{
        self,
        SHOCK_DURATION,
    },
    scorebook::ScorebookClient,
    session::{
        Choice,
        DEX_END,
        DEX_START,
        DexId,
        Direction,
        NavError,
        RenderStyle,
        SessionPhase,
        SessionState,
    },
    ui,
};
use chrono::Utc;
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use itertools::Itertools;
use rand::{
    Rng,
    rngs::ThreadRng,
};
use std::collections::{
    HashMap,
    HashSet,
};
use tokio::{
    sync::mpsc,
    time,
};
use tracing::{
    error,
    warn,
};

// How far past the current card the fetch worker reads ahead.
const PREFETCH_AHEAD: DexId = 2;
const ERROR_HISTORY: usize = 3;
const SHINY_ODDS: u32 = 4096;

const FRONTIER_NOTICE: &str = "You haven't Smashed or Passed this Pokemon yet!";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api_url: String,
    pub score_url: Option<String>,
    pub profile: Option<String>,
    pub profile_dir: Option<String>,
    pub style: Option<RenderStyle>,
}

#[derive(Clone, Debug)]
pub struct AppSnapshot {
    pub current_id: DexId,
    pub phase: SessionPhase,
    pub smashes: u32,
    pub passes: u32,
    pub style: RenderStyle,
    pub display_name: Option<String>,
    pub pokemon: Option<PokemonMetadata>,
    pub species: Option<SpeciesMetadata>,
    pub background: Option<&'static str>,
    pub shiny: bool,
    pub seen_ending: bool,
    pub status: String,
    pub errors: Vec<String>,
    pub fault: Option<String>,
}

#[derive(Clone, Copy, Debug)]
struct PendingDecision {
    id: DexId,
    choice: Choice,
}

enum FetchCommand {
    Fetch(DexId),
    Shutdown,
}

enum FetchEvent {
    Loaded {
        id: DexId,
        pokemon: PokemonMetadata,
        species: Option<SpeciesMetadata>,
    },
    Failed {
        id: DexId,
        error: String,
    },
}

enum TaskEvent {
    ReactionDone { id: DexId },
    WriteFailed { id: DexId, error: String },
}

pub struct AppController {
    session: SessionState,
    catalog: CatalogClient,
    scorebook: Option<ScorebookClient>,
    profile: Option<Profile>,
    profile_descriptor: Option<ProfileDescriptor>,
    pokemon_cache: HashMap<DexId, PokemonMetadata>,
    species_cache: HashMap<DexId, SpeciesMetadata>,
    backgrounds: HashMap<DexId, &'static str>,
    shinies: HashMap<DexId, bool>,
    requested: HashSet<DexId>,
    pending: Option<PendingDecision>,
    seen_ending: bool,
    status: String,
    errors: Vec<String>,
    fault: Option<String>,
    rng: ThreadRng,
}

impl AppController {
    pub async fn new(config: AppConfig) -> Result<Self> {
        let catalog = CatalogClient::new(&config.api_url)?;

        let (profile, profile_descriptor) = match &config.profile {
            Some(name) => {
                let dir = profiles::resolve_profile_dir(config.profile_dir.as_deref())?;
                let descriptor = profiles::find_profile(&dir, name)?;
                let profile = profiles::load_profile(&descriptor)?;
                (Some(profile), Some(descriptor))
            }
            None => (None, None),
        };

        let scorebook = match &config.score_url {
            Some(url) => {
                if profile.is_none() {
                    return Err(eyre!(
                        "--score-url needs --profile to know whose score to keep"
                    ));
                }
                Some(ScorebookClient::new(url)?)
            }
            None => None,
        };

        let style = config
            .style
            .or(profile.as_ref().and_then(|p| p.style))
            .unwrap_or_default();

        let mut status = String::from("Ready");
        let session = match (&scorebook, &profile) {
            (Some(scorebook), Some(profile)) => {
                let score = scorebook
                    .get_score(&profile.user_id)
                    .await
                    .wrap_err("failed to fetch the recorded score for resume")?;
                match score {
                    Some(score) => {
                        status = format!(
                            "Welcome back, {}! {} decided so far.",
                            profile.display_name,
                            score.smash_count + score.pass_count
                        );
                        SessionState::resume(
                            score.highest_decided(),
                            score.smash_count,
                            score.pass_count,
                            style,
                        )
                    }
                    None => SessionState::new(style),
                }
            }
            _ => SessionState::new(style),
        };

        let seen_ending = session.phase() == SessionPhase::Completed;

        Ok(Self {
            session,
            catalog,
            scorebook,
            profile,
            profile_descriptor,
            pokemon_cache: HashMap::new(),
            species_cache: HashMap::new(),
            backgrounds: HashMap::new(),
            shinies: HashMap::new(),
            requested: HashSet::new(),
            pending: None,
            seen_ending,
            status,
            errors: Vec::new(),
            fault: None,
            rng: rand::rng(),
        })
    }

    fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    fn push_error(&mut self, message: String) {
        self.errors.push(message);
        if self.errors.len() > ERROR_HISTORY {
            self.errors.remove(0);
        }
    }

    fn mutations_blocked(&self) -> bool {
        self.fault.is_some()
    }

    fn ingest_entity(
        &mut self,
        id: DexId,
        pokemon: PokemonMetadata,
        species: Option<SpeciesMetadata>,
    ) {
        self.requested.remove(&id);
        tracing::debug!(
            id,
            name = %pokemon.name,
            types = %pokemon.types.iter().map(|kind| kind.name()).join("/"),
            "catalog entity cached"
        );
        if let Some(bg) = ui::pick_background(&pokemon.types, &mut self.rng) {
            self.backgrounds.insert(id, bg);
        }
        self.shinies
            .entry(id)
            .or_insert_with(|| self.rng.random_ratio(1, SHINY_ODDS));
        self.pokemon_cache.insert(id, pokemon);
        if let Some(species) = species {
            self.species_cache.insert(id, species);
        }
        if id == self.session.current_id() {
            self.fault = None;
        }
    }

    fn note_fetch_failure(&mut self, id: DexId, error: String) {
        self.requested.remove(&id);
        warn!(id, %error, "catalog fetch failed");
        if id == self.session.current_id() {
            self.fault = Some(format!("Couldn't reach the Pokémon catalog: {error}"));
        }
    }

    fn request_visible(&mut self, tx: &mpsc::UnboundedSender<FetchCommand>) {
        if self.fault.is_some() {
            return;
        }
        let current = self.session.current_id();
        for id in current..=current.saturating_add(PREFETCH_AHEAD) {
            if !(DEX_START..=DEX_END).contains(&id) {
                continue;
            }
            if self.pokemon_cache.contains_key(&id) || self.requested.contains(&id) {
                continue;
            }
            if tx.send(FetchCommand::Fetch(id)).is_ok() {
                self.requested.insert(id);
            }
        }
    }

    fn retry_fetch(&mut self, tx: &mpsc::UnboundedSender<FetchCommand>) {
        if self.fault.take().is_some() {
            self.set_status("Retrying catalog fetch...");
        }
        self.requested.remove(&self.session.current_id());
        self.request_visible(tx);
    }

    fn cancel_pending(&mut self, ui_state: &mut ui::UiState) {
        if self.pending.take().is_some() {
            ui_state.clear_shock();
        }
    }

    fn handle_advance(&mut self, ui_state: &mut ui::UiState) {
        if self.mutations_blocked() {
            return;
        }
        self.cancel_pending(ui_state);
        match self.session.advance() {
            Ok(()) => {}
            Err(NavError::Undecided) => self.set_status(FRONTIER_NOTICE),
            Err(NavError::OutOfRange) => {}
        }
    }

    fn handle_retreat(&mut self, ui_state: &mut ui::UiState) {
        if self.mutations_blocked() {
            return;
        }
        self.cancel_pending(ui_state);
        // Retreating never un-records a decision.
        let _ = self.session.retreat();
    }

    fn handle_swipe(
        &mut self,
        direction: Direction,
        ui_state: &mut ui::UiState,
        task_tx: &mpsc::UnboundedSender<TaskEvent>,
    ) {
        if self.mutations_blocked() {
            return;
        }
        if self.session.phase() == SessionPhase::Completed {
            return;
        }
        let Some(choice) = direction.choice() else {
            return;
        };
        // A second swipe-complete for the same card is dropped until the
        // pending commit resolves.
        if self.pending.is_some() {
            return;
        }
        let id = self.session.current_id();
        let species = self.species_cache.get(&id);
        match reaction::evaluate(species, id, direction) {
            Some(shock) => {
                self.pending = Some(PendingDecision { id, choice });
                ui_state.show_shock(&shock);
                self.set_status("...");
                let tx = task_tx.clone();
                tokio::spawn(async move {
                    time::sleep(SHOCK_DURATION).await;
                    let _ = tx.send(TaskEvent::ReactionDone { id });
                });
            }
            None => self.commit_decision(id, choice, task_tx),
        }
    }

    fn commit_pending(
        &mut self,
        id: DexId,
        task_tx: &mpsc::UnboundedSender<TaskEvent>,
    ) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        // The player navigated away mid-shock: nothing is recorded.
        if pending.id != id || self.session.current_id() != id {
            return;
        }
        self.commit_decision(id, pending.choice, task_tx);
    }

    fn commit_decision(
        &mut self,
        id: DexId,
        choice: Choice,
        task_tx: &mpsc::UnboundedSender<TaskEvent>,
    ) {
        let Some(record) = self.session.record_decision(choice) else {
            return;
        };
        let name = self
            .pokemon_cache
            .get(&id)
            .map(PokemonMetadata::display_name)
            .unwrap_or_else(|| format!("#{id}"));
        match choice {
            Choice::Smash => self.set_status(format!("Smashed {name}!")),
            Choice::Pass => self.set_status(format!("Passed {name}.")),
        }
        if self.session.phase() == SessionPhase::Completed {
            self.seen_ending = true;
            self.set_status("That was the last one. Roll credits!");
        }
        if let (Some(scorebook), Some(profile)) = (&self.scorebook, &self.profile) {
            let scorebook = scorebook.clone();
            let user_id = profile.user_id.clone();
            let tx = task_tx.clone();
            // Fire and forget: the local session stays authoritative even if
            // the write never lands.
            tokio::spawn(async move {
                if let Err(err) = scorebook.record_choice(&user_id, &record).await {
                    error!(error = %err, id = record.id, "choice write failed");
                    let _ = tx.send(TaskEvent::WriteFailed {
                        id: record.id,
                        error: err.to_string(),
                    });
                }
            });
        }
    }

    fn cycle_style(&mut self) {
        self.session.style = self.session.style.next();
        self.set_status(format!("Card style: {}", self.session.style.as_str()));
    }

    fn replay_ending(&mut self, ui_state: &mut ui::UiState) {
        // Replay never touches the counters.
        if self.session.phase() == SessionPhase::Completed && self.seen_ending {
            ui_state.start_celebration();
        }
    }

    fn persist_profile(&mut self) {
        let (Some(descriptor), Some(profile)) = (
            self.profile_descriptor.as_ref(),
            self.profile.as_mut(),
        ) else {
            return;
        };
        profile.style = Some(self.session.style);
        profile.last_played_at = Some(Utc::now());
        if let Err(err) = profiles::save_profile(descriptor, profile) {
            warn!(error = %err, "failed to persist profile");
        }
    }

    fn build_snapshot(&self) -> AppSnapshot {
        let current = self.session.current_id();
        AppSnapshot {
            current_id: current,
            phase: self.session.phase(),
            smashes: self.session.smashes(),
            passes: self.session.passes(),
            style: self.session.style,
            display_name: self
                .profile
                .as_ref()
                .map(|profile| profile.display_name.clone()),
            pokemon: self.pokemon_cache.get(&current).cloned(),
            species: self.species_cache.get(&current).cloned(),
            background: self.backgrounds.get(&current).copied(),
            shiny: self.shinies.get(&current).copied().unwrap_or(false),
            seen_ending: self.seen_ending,
            status: self.status.clone(),
            errors: self.errors.clone(),
            fault: self.fault.clone(),
        }
    }
}

async fn fetch_worker(
    catalog: CatalogClient,
    mut cmd_rx: mpsc::UnboundedReceiver<FetchCommand>,
    event_tx: mpsc::UnboundedSender<FetchEvent>,
) -> Result<()> {
    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            FetchCommand::Fetch(id) => {
                let event = match catalog.get_pokemon(id).await {
                    Ok(pokemon) => {
                        // Species data is best effort: reactions and flavor
                        // text degrade, the card itself does not.
                        let species =
                            match catalog.get_species(&pokemon.species_name).await {
                                Ok(species) => species,
                                Err(err) => {
                                    warn!(id, error = %err, "species fetch failed");
                                    None
                                }
                            };
                        FetchEvent::Loaded {
                            id,
                            pokemon,
                            species,
                        }
                    }
                    Err(err) => FetchEvent::Failed {
                        id,
                        error: err.to_string(),
                    },
                };
                event_tx
                    .send(event)
                    .map_err(|_| eyre!("fetch receiver dropped"))?;
            }
            FetchCommand::Shutdown => break,
        }
    }
    Ok(())
}

pub async fn run_app(config: AppConfig) -> Result<()> {
    let mut controller = AppController::new(config).await?;
    let mut ui_state = ui::UiState::default();
    let mut input_events = ui::input_event_stream();

    tracing::info!("Starting UI");
    ui::terminal_enter(&mut ui_state)?;
    tracing::info!("UI ready");
    let res = run_loop(&mut controller, &mut ui_state, &mut input_events).await;
    ui::terminal_exit()?;
    controller.persist_profile();
    res
}

async fn run_loop(
    controller: &mut AppController,
    ui_state: &mut ui::UiState,
    input_events: &mut ui::InputEventReceiver,
) -> Result<()> {
    tracing::info!("Running app loop");
    let (fetch_cmd_tx, fetch_cmd_rx) = mpsc::unbounded_channel();
    let (fetch_event_tx, mut fetch_event_rx) = mpsc::unbounded_channel();
    let fetch_handle = tokio::spawn(fetch_worker(
        controller.catalog.clone(),
        fetch_cmd_rx,
        fetch_event_tx,
    ));
    let (task_tx, mut task_rx) = mpsc::unbounded_channel();

    controller.request_visible(&fetch_cmd_tx);
    ui::draw(ui_state, &controller.build_snapshot())
        .wrap_err("initial draw failed")?;

    loop {
        tokio::select! {
            maybe_event = fetch_event_rx.recv() => {
                match maybe_event {
                    Some(FetchEvent::Loaded { id, pokemon, species }) => {
                        controller.ingest_entity(id, pokemon, species);
                        controller.request_visible(&fetch_cmd_tx);
                        ui::draw(ui_state, &controller.build_snapshot())
                            .wrap_err("draw after catalog fetch failed")?;
                    }
                    Some(FetchEvent::Failed { id, error }) => {
                        controller.note_fetch_failure(id, error);
                        ui::draw(ui_state, &controller.build_snapshot())
                            .wrap_err("draw after catalog failure failed")?;
                    }
                    None => {
                        warn!("fetch worker channel closed");
                        break;
                    }
                }
            }
            maybe_task = task_rx.recv() => {
                let Some(task) = maybe_task else {
                    continue;
                };
                match task {
                    TaskEvent::ReactionDone { id } => {
                        ui_state.clear_shock();
                        controller.commit_pending(id, &task_tx);
                        controller.request_visible(&fetch_cmd_tx);
                        ui::draw(ui_state, &controller.build_snapshot())
                            .wrap_err("draw after shock commit failed")?;
                    }
                    TaskEvent::WriteFailed { id, error } => {
                        controller.push_error(format!(
                            "Couldn't save your choice for #{id}: {error}"
                        ));
                        ui::draw(ui_state, &controller.build_snapshot())
                            .wrap_err("draw after write failure failed")?;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                let _ = fetch_cmd_tx.send(FetchCommand::Shutdown);
                break;
            }
            raw_ev = ui::next_raw_event(input_events) => {
                let event = raw_ev?;
                let Some(ev) = ui::interpret_event(ui_state, event) else {
                    continue;
                };
                match ev {
                    ui::UserEvent::Quit => {
                        let _ = fetch_cmd_tx.send(FetchCommand::Shutdown);
                        break;
                    }
                    ui::UserEvent::Redraw => {}
                    ui::UserEvent::Advance => controller.handle_advance(ui_state),
                    ui::UserEvent::Retreat => controller.handle_retreat(ui_state),
                    ui::UserEvent::Swipe(direction) => {
                        controller.handle_swipe(direction, ui_state, &task_tx)
                    }
                    ui::UserEvent::CycleStyle => controller.cycle_style(),
                    ui::UserEvent::ReplayEnding => controller.replay_ending(ui_state),
                    ui::UserEvent::RetryFetch => controller.retry_fetch(&fetch_cmd_tx),
                }
                controller.request_visible(&fetch_cmd_tx);
                ui::draw(ui_state, &controller.build_snapshot())
                    .wrap_err("draw after input failed")?;
            }
        }
    }
    drop(fetch_cmd_tx);
    if let Err(err) = fetch_handle.await {
        warn!(error = %err, "fetch worker did not shut down cleanly");
    }
    Ok(())
}
