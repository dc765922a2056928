//! Terminal presentation of a spin session
//!
//! Consumes stage events from the controller and turns them into reel
//! frames, audio cues and a win/lose reaction. Nothing in here feeds back
//! into the engine.

use std::fmt;
use std::io::{self, Write};

use reel_stage::{SpinVerdict, Stage, StageEvent};

// ═══════════════════════════════════════════════════════════════════════════════
// SOUND
// ═══════════════════════════════════════════════════════════════════════════════

/// Audio cue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    BackgroundLoop,
    Spin,
    Win,
    Lose,
}

impl Cue {
    pub fn asset(&self) -> &'static str {
        match self {
            Cue::BackgroundLoop => "bg_loop",
            Cue::Spin => "spin_sfx",
            Cue::Win => "win_sfx",
            Cue::Lose => "lose_sfx",
        }
    }
}

impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.asset())
    }
}

/// Sound output with a runtime on/off toggle.
///
/// There is no audio device here; cues are logged and counted.
#[derive(Debug)]
pub struct SoundBoard {
    enabled: bool,
    background_playing: bool,
    played: Vec<Cue>,
}

impl SoundBoard {
    pub fn new(enabled: bool) -> Self {
        let mut board = Self {
            enabled,
            background_playing: false,
            played: Vec::new(),
        };
        if enabled {
            board.start_background();
        }
        board
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_background_playing(&self) -> bool {
        self.background_playing
    }

    /// Cues actually played, in order
    pub fn played(&self) -> &[Cue] {
        &self.played
    }

    /// Flip the toggle. Returns the new state.
    pub fn toggle(&mut self) -> bool {
        self.enabled = !self.enabled;
        if self.enabled {
            self.start_background();
        } else if self.background_playing {
            log::debug!("[Sound] pause {}", Cue::BackgroundLoop);
            self.background_playing = false;
        }
        self.enabled
    }

    /// Play a one-shot cue. Muted cues are dropped, not deferred.
    pub fn play(&mut self, cue: Cue) -> bool {
        if !self.enabled {
            log::trace!("[Sound] muted {cue}");
            return false;
        }
        log::debug!("[Sound] play {cue}");
        self.played.push(cue);
        true
    }

    fn start_background(&mut self) {
        if !self.background_playing {
            log::debug!("[Sound] loop {}", Cue::BackgroundLoop);
            self.background_playing = true;
            self.played.push(Cue::BackgroundLoop);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// REACTIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// What a reaction player showed for a verdict
#[derive(Debug, Clone, PartialEq)]
pub enum Reaction {
    /// Skeletal animation track, then back to a looping track
    Skeletal {
        track: &'static str,
        then: &'static str,
    },
    /// Falling particles over a pulsing reel row
    Burst { particles: usize, pulse: f32 },
    /// Horizontal shake of the reel row
    Shake { offset: u32, repeats: u32 },
}

impl fmt::Display for Reaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reaction::Skeletal { track, then } => write!(f, "skeleton plays '{track}' then '{then}'"),
            Reaction::Burst { particles, pulse } => {
                write!(f, "{particles} particles, reels pulse x{pulse:.2}")
            }
            Reaction::Shake { offset, repeats } => {
                write!(f, "reels shake {offset}px x{repeats}")
            }
        }
    }
}

/// Win/lose reaction backend
pub trait ReactionPlayer: Send {
    fn name(&self) -> &'static str;

    fn react(&mut self, verdict: SpinVerdict) -> Reaction;
}

/// Character rig with win/lose/idle tracks
#[derive(Debug, Default)]
pub struct SkeletalReaction;

impl ReactionPlayer for SkeletalReaction {
    fn name(&self) -> &'static str {
        "skeletal"
    }

    fn react(&mut self, verdict: SpinVerdict) -> Reaction {
        let track = match verdict {
            SpinVerdict::Win => "win",
            SpinVerdict::Lose => "lose",
        };
        Reaction::Skeletal { track, then: "idle" }
    }
}

/// Fallback effects for hosts without skeletal animation
#[derive(Debug, Default)]
pub struct ParticleReaction;

impl ParticleReaction {
    const WIN_PARTICLES: usize = 12;
    const WIN_PULSE: f32 = 1.08;
    const LOSE_OFFSET: u32 = 6;
    const LOSE_REPEATS: u32 = 3;
}

impl ReactionPlayer for ParticleReaction {
    fn name(&self) -> &'static str {
        "particle"
    }

    fn react(&mut self, verdict: SpinVerdict) -> Reaction {
        match verdict {
            SpinVerdict::Win => Reaction::Burst {
                particles: Self::WIN_PARTICLES,
                pulse: Self::WIN_PULSE,
            },
            SpinVerdict::Lose => Reaction::Shake {
                offset: Self::LOSE_OFFSET,
                repeats: Self::LOSE_REPEATS,
            },
        }
    }
}

/// Pick the reaction backend once, from the host's capability flag
pub fn reaction_player(skeletal: bool) -> Box<dyn ReactionPlayer> {
    if skeletal {
        Box::new(SkeletalReaction)
    } else {
        Box::new(ParticleReaction)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TERMINAL
// ═══════════════════════════════════════════════════════════════════════════════

/// Command typed by the player while spins run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerInput {
    ToggleSound,
    /// Stop after the current spin
    Quit,
}

impl PlayerInput {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "m" | "s" | "sound" => Some(Self::ToggleSound),
            "q" | "quit" => Some(Self::Quit),
            _ => None,
        }
    }
}

pub struct TerminalPresenter<W> {
    out: W,
    sound: SoundBoard,
    reactions: Box<dyn ReactionPlayer>,
    show_ticks: bool,
    reels: Vec<String>,
    trigger_visible: Option<bool>,
}

impl<W: Write> TerminalPresenter<W> {
    pub fn new(
        out: W,
        sound: SoundBoard,
        reactions: Box<dyn ReactionPlayer>,
        show_ticks: bool,
    ) -> Self {
        log::info!(
            "[Presenter] sound {}, {} reactions",
            if sound.is_enabled() { "on" } else { "off" },
            reactions.name()
        );
        Self {
            out,
            sound,
            reactions,
            show_ticks,
            reels: Vec::new(),
            trigger_visible: None,
        }
    }

    pub fn sound(&self) -> &SoundBoard {
        &self.sound
    }

    /// Flip the sound toggle and show its new state
    pub fn toggle_sound(&mut self) -> io::Result<bool> {
        let enabled = self.sound.toggle();
        writeln!(self.out, "Sound: {}", if enabled { "ON" } else { "OFF" })?;
        Ok(enabled)
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Show or hide the spin control. Repeats of the current state draw nothing.
    pub fn show_trigger(&mut self, visible: bool) -> io::Result<()> {
        if self.trigger_visible.replace(visible) == Some(visible) {
            return Ok(());
        }
        if visible {
            writeln!(self.out, "[ SPIN ]")
        } else {
            writeln!(self.out, "[ .... ]")
        }
    }

    pub fn on_event(&mut self, event: &StageEvent) -> io::Result<()> {
        match &event.stage {
            Stage::SpinRequested { reel_count } => {
                self.reels = vec!["?".to_string(); *reel_count as usize];
                self.sound.play(Cue::Spin);
                let id = event.request_id.unwrap_or_default();
                writeln!(self.out, "spin #{id}")
            }
            Stage::TriggerIgnored => writeln!(self.out, "  (spin in progress)"),
            Stage::ReelTick { reel_index, symbol } => {
                self.set_reel(*reel_index, symbol);
                if self.show_ticks {
                    self.frame(None)
                } else {
                    Ok(())
                }
            }
            Stage::ReelLocked { reel_index, symbol } => {
                self.set_reel(*reel_index, symbol);
                self.frame(Some(*reel_index))
            }
            Stage::Resolved { verdict, outcome } => {
                self.sound.play(match verdict {
                    SpinVerdict::Win => Cue::Win,
                    SpinVerdict::Lose => Cue::Lose,
                });
                let reaction = self.reactions.react(*verdict);
                writeln!(
                    self.out,
                    "  {} {}  ({reaction})",
                    verdict.display_name(),
                    outcome.join(" | ")
                )
            }
            Stage::Aborted { reason } => writeln!(self.out, "  spin aborted: {reason}"),
            Stage::OutcomeReceived { .. } | Stage::ReelSpinning { .. } | Stage::SpinAvailable => {
                Ok(())
            }
        }
    }

    fn set_reel(&mut self, reel_index: u8, symbol: &str) {
        if let Some(slot) = self.reels.get_mut(reel_index as usize) {
            symbol.clone_into(slot);
        }
    }

    fn frame(&mut self, locked: Option<u8>) -> io::Result<()> {
        let row = self.reels.join(" | ");
        match locked {
            Some(reel_index) => writeln!(self.out, "  [ {row} ]  reel {} stopped", reel_index + 1),
            None => writeln!(self.out, "  [ {row} ]"),
        }
    }
}
