//! duelcore - scenario runner
//!
//! Loads a duel scenario from JSON, runs its actions through the engine and
//! prints every message the duel produced, one JSON record per line.
//!
//! ## Usage
//!
//! ```
//! duelcore <scenario.json> [OPTIONS]
//!
//! Options:
//!   --options <file>   Duel options (overrides the scenario's own)
//!   --seed <n>         Seed for coins, dice and shuffles
//!   --bytes            Also print the concatenated wire encoding as hex
//! ```
//!
//! Requests the scenario does not answer get a default answer: the first
//! option, the first legal zone or position, the minimum number of cards.

use duelcore::actions::Actions;
use duelcore::card::CardData;
use duelcore::decision::{Response, RunState, SelectRequest};
use duelcore::{CardId, CardSet, Duel, DuelOptions, Location, NullScript, PlayerId, Position, Reason};
use serde::Deserialize;
use std::collections::VecDeque;
use std::env;
use std::fs;

/// A card placed before the first action runs.
#[derive(Debug, Deserialize)]
struct ScenarioCard {
    owner: u8,
    location: Location,
    #[serde(default)]
    sequence: Option<u32>,
    #[serde(default)]
    position: Option<Position>,
    data: CardData,
}

/// One scripted action. Card references are indices into `cards`.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum ScenarioAction {
    Draw { player: u8, count: u32 },
    Damage { player: u8, amount: u32 },
    Recover { player: u8, amount: u32 },
    PayLpCost { player: u8, amount: u32 },
    Destroy { cards: Vec<usize> },
    Release { player: u8, cards: Vec<usize> },
    SendToGrave { cards: Vec<usize> },
    SendToHand { cards: Vec<usize> },
    Banish { cards: Vec<usize> },
    Summon { player: u8, card: usize },
    MonsterSet { player: u8, card: usize },
    FlipSummon { player: u8, card: usize },
    SpecialSummon {
        player: u8,
        cards: Vec<usize>,
        #[serde(default)]
        position: Option<Position>,
    },
    SpellSet { player: u8, card: usize },
    ChangePosition { player: u8, card: usize, position: Position },
    Equip { player: u8, card: usize, target: usize },
    TossCoin { player: u8, count: u8 },
    TossDice { player: u8, count: u8 },
}

#[derive(Debug, Default, Deserialize)]
struct Scenario {
    #[serde(default)]
    options: DuelOptions,
    #[serde(default)]
    cards: Vec<ScenarioCard>,
    #[serde(default)]
    actions: Vec<ScenarioAction>,
    #[serde(default)]
    answers: VecDeque<Response>,
}

struct RunnerArgs {
    scenario: String,
    options: Option<String>,
    seed: Option<u64>,
    bytes: bool,
}

fn parse_args() -> Result<RunnerArgs, String> {
    let args: Vec<String> = env::args().collect();
    let mut scenario = None;
    let mut options = None;
    let mut seed = None;
    let mut bytes = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--options" => {
                options = Some(args.get(i + 1).ok_or("--options requires a file path")?.clone());
                i += 2;
            }
            "--seed" => {
                let value = args.get(i + 1).ok_or("--seed requires a number")?;
                seed = Some(value.parse().map_err(|err| format!("invalid seed '{value}': {err}"))?);
                i += 2;
            }
            "--bytes" => {
                bytes = true;
                i += 1;
            }
            other if scenario.is_none() && !other.starts_with("--") => {
                scenario = Some(other.to_string());
                i += 1;
            }
            other => return Err(format!("unknown argument '{other}'")),
        }
    }

    Ok(RunnerArgs {
        scenario: scenario.ok_or("missing scenario file")?,
        options,
        seed,
        bytes,
    })
}

fn load_scenario(args: &RunnerArgs) -> Result<Scenario, String> {
    let text = fs::read_to_string(&args.scenario).map_err(|err| format!("Failed to read {}: {err}", args.scenario))?;
    let mut scenario: Scenario =
        serde_json::from_str(&text).map_err(|err| format!("Failed to parse {}: {err}", args.scenario))?;
    if let Some(path) = &args.options {
        let text = fs::read_to_string(path).map_err(|err| format!("Failed to read {path}: {err}"))?;
        scenario.options = DuelOptions::from_json(&text).map_err(|err| err.to_string())?;
    }
    if let Some(seed) = args.seed {
        scenario.options = scenario.options.with_seed(seed);
    }
    Ok(scenario)
}

/// Answer used when the scenario runs out of scripted answers.
fn default_answer(request: &SelectRequest) -> Response {
    match request {
        SelectRequest::Cards { min, cards, .. } => Response::Cards(cards.iter().copied().take(*min as usize).collect()),
        SelectRequest::UnselectCard {
            finishable, selectable, ..
        } => match selectable.first() {
            Some(&card) if !*finishable => Response::Cards(vec![card]),
            _ => Response::Cancel,
        },
        SelectRequest::YesNo { .. } | SelectRequest::EffectYesNo { .. } => Response::YesNo(true),
        SelectRequest::Option { .. } => Response::Option(0),
        SelectRequest::Place { player, zones, .. } => {
            let bit = zones.trailing_zeros();
            let owner = if bit >= 16 { player.opponent() } else { *player };
            let location = if bit % 16 >= 8 { Location::SZONE } else { Location::MZONE };
            Response::Place {
                player: owner,
                location,
                sequence: bit % 8,
            }
        }
        SelectRequest::Position { positions, .. } => {
            let first = positions.bits() & positions.bits().wrapping_neg();
            Response::Position(Position::from_bits_truncate(first))
        }
        SelectRequest::Counter { count, cards, .. } => {
            let mut left = *count;
            let counts = cards
                .iter()
                .map(|&(_, available)| {
                    let take = available.min(left);
                    left -= take;
                    take
                })
                .collect();
            Response::Counters(counts)
        }
        SelectRequest::Tribute { min, cards, .. } => {
            let mut worth = 0;
            let mut chosen = Vec::new();
            for &(card, value) in cards {
                if worth >= *min {
                    break;
                }
                worth += value;
                chosen.push(card);
            }
            Response::Cards(chosen)
        }
    }
}

fn card_set(ids: &[CardId], indices: &[usize]) -> Result<CardSet, String> {
    indices.iter().map(|&i| card_at(ids, i)).collect()
}

fn card_at(ids: &[CardId], index: usize) -> Result<CardId, String> {
    ids.get(index).copied().ok_or_else(|| format!("no card at index {index}"))
}

fn queue_action(duel: &mut Duel, ids: &[CardId], action: &ScenarioAction) -> Result<(), String> {
    let none = PlayerId::NONE;
    match action {
        ScenarioAction::Draw { player, count } => duel.draw(None, Reason::RULE, none, PlayerId(*player), *count),
        ScenarioAction::Damage { player, amount } => {
            duel.damage(None, Reason::EFFECT, none, None, PlayerId(*player), *amount, false)
        }
        ScenarioAction::Recover { player, amount } => duel.recover(None, Reason::EFFECT, none, PlayerId(*player), *amount, false),
        ScenarioAction::PayLpCost { player, amount } => duel.pay_lp_cost(PlayerId(*player), *amount),
        ScenarioAction::Destroy { cards } => {
            let targets = card_set(ids, cards)?;
            duel.destroy(targets, None, Reason::EFFECT, none, none, Location::GRAVE, 0);
        }
        ScenarioAction::Release { player, cards } => {
            let targets = card_set(ids, cards)?;
            duel.release(targets, None, Reason::COST, PlayerId(*player));
        }
        ScenarioAction::SendToGrave { cards } => {
            let targets = card_set(ids, cards)?;
            duel.send_to(targets, None, Reason::EFFECT, none, none, Location::GRAVE, 0, Position::FACEUP, false);
        }
        ScenarioAction::SendToHand { cards } => {
            let targets = card_set(ids, cards)?;
            duel.send_to(targets, None, Reason::EFFECT, none, none, Location::HAND, 0, Position::FACEUP, false);
        }
        ScenarioAction::Banish { cards } => {
            let targets = card_set(ids, cards)?;
            duel.send_to(targets, None, Reason::EFFECT, none, none, Location::REMOVED, 0, Position::FACEUP, false);
        }
        ScenarioAction::Summon { player, card } => duel.summon(PlayerId(*player), card_at(ids, *card)?, None, false, 0, 0x1f),
        ScenarioAction::MonsterSet { player, card } => duel.mset(PlayerId(*player), card_at(ids, *card)?, None, false, 0, 0x1f),
        ScenarioAction::FlipSummon { player, card } => duel.flip_summon(PlayerId(*player), card_at(ids, *card)?),
        ScenarioAction::SpecialSummon { player, cards, position } => {
            let targets = card_set(ids, cards)?;
            let player = PlayerId(*player);
            let positions = position.unwrap_or(Position::FACEUP);
            duel.special_summon(targets, 0, player, player, false, false, positions, 0xff);
        }
        ScenarioAction::SpellSet { player, card } => {
            let player = PlayerId(*player);
            duel.spell_set(player, card_at(ids, *card)?, player, false);
        }
        ScenarioAction::ChangePosition { player, card, position } => {
            duel.change_position_to(card_at(ids, *card)?, None, PlayerId(*player), *position, false, false)
        }
        ScenarioAction::Equip { player, card, target } => {
            duel.equip(PlayerId(*player), card_at(ids, *card)?, card_at(ids, *target)?, true, false)
        }
        ScenarioAction::TossCoin { player, count } => duel.toss_coin(None, none, PlayerId(*player), *count),
        ScenarioAction::TossDice { player, count } => duel.toss_dice(None, none, PlayerId(*player), *count, 0),
    }
    Ok(())
}

fn run(args: &RunnerArgs) -> Result<(), String> {
    let mut scenario = load_scenario(args)?;
    let mut duel = Duel::new(scenario.options, Box::new(NullScript));

    let mut ids = Vec::with_capacity(scenario.cards.len());
    for card in &scenario.cards {
        let owner = PlayerId(card.owner);
        let id = if card.location.is_onfield() {
            let position = card.position.unwrap_or(Position::FACEUP_ATTACK);
            duel.state
                .create_field_card(owner, card.data.clone(), card.location, card.sequence.unwrap_or(0), position)
        } else {
            duel.state.create_card(owner, card.data.clone(), card.location)
        };
        ids.push(id);
    }

    for action in &scenario.actions {
        queue_action(&mut duel, &ids, action)?;
        loop {
            match duel.run() {
                RunState::Idle => break,
                RunState::NeedsInput(request) => {
                    let answer = scenario.answers.pop_front().unwrap_or_else(|| default_answer(&request));
                    duel.respond(answer)
                        .map_err(|err| format!("answer to {} rejected: {err}", request.kind()))?;
                }
            }
        }
    }

    for message in duel.state.messages.records() {
        let line = serde_json::to_string(message).map_err(|err| format!("Failed to encode message: {err}"))?;
        println!("{line}");
    }
    if args.bytes {
        let hex: String = duel.state.messages.encode_all().iter().map(|b| format!("{b:02x}")).collect();
        println!("{hex}");
    }
    for p in [PlayerId::ZERO, PlayerId::ONE] {
        let player = duel.state.player(p);
        eprintln!(
            "player {}: lp {} hand {} deck {} grave {}",
            p.0,
            player.lp,
            player.list_hand.len(),
            player.list_main.len(),
            player.list_grave.len()
        );
    }
    Ok(())
}

fn main() {
    let result = parse_args().and_then(|args| run(&args));
    if let Err(err) = result {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
