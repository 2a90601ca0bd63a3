use std::ops::RangeInclusive;

use rand::prelude::*;

pub const ACE: u32 = 1;
const ACE_ALT_VALUE: u32 = 11;
const FACE_VALUE: u32 = 10;
pub const MAX_VALUE: u32 = 21;
const DEALER_STICK_VALUE: u32 = 17;

// Player sums the policy is learned for. Below 11 a hit can never bust the hand.
pub const MIN_PLAYER_SUM: u32 = 11;
pub const PLAYER_SUMS: RangeInclusive<u32> = MIN_PLAYER_SUM..=MAX_VALUE;
pub const DEALER_CARDS: RangeInclusive<u32> = ACE..=FACE_VALUE;

#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Action {
    Hit,
    #[default]
    Stick,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Outcome {
    Win,
    Draw,
    Loss,
}

// A decision point of the player: what the dealer shows and what the player holds.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct PlayerState {
    dealer_card: u32,
    player_sum: u32,
    usable_ace: bool,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct StateAction {
    pub state: PlayerState,
    pub action: Action,
}

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct PlayerHand {
    // Value counts usable ace as 11.
    value: u32,
    usable_ace: bool,
}

// The usable-ace flag of the state key is fixed when the player is created. It
// keeps its value after the hand converts its ace.
#[derive(Clone, Debug)]
pub struct Player {
    hand: PlayerHand,
    dealer_card: u32,
    usable_ace: bool,
}

#[derive(Clone, Debug, Default)]
pub struct DealerHand {
    cards: Vec<u32>,
}

impl Action {
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Action {
        Action::from(rng.gen_bool(0.5))
    }

    pub fn is_hit(&self) -> bool {
        *self == Action::Hit
    }

    // Token used by the plain policy grid.
    pub fn token(&self) -> &'static str {
        match self {
            Action::Hit => "1",
            Action::Stick => "0",
        }
    }
}

impl From<bool> for Action {
    fn from(hit: bool) -> Action {
        if hit {
            Action::Hit
        } else {
            Action::Stick
        }
    }
}

impl From<Action> for bool {
    fn from(action: Action) -> bool {
        action.is_hit()
    }
}

impl Outcome {
    pub fn reward(&self) -> f64 {
        match self {
            Outcome::Win => 1.0,
            Outcome::Draw => 0.0,
            Outcome::Loss => -1.0,
        }
    }

    // Compares a standing player total with the dealer's finished hand.
    pub fn showdown(player_value: u32, dealer: &DealerHand) -> Outcome {
        let dealer_value = dealer.value();
        if dealer.is_bust() || dealer_value < player_value {
            Outcome::Win
        } else if dealer_value > player_value {
            Outcome::Loss
        } else {
            Outcome::Draw
        }
    }
}

impl PlayerState {
    pub fn new(player_sum: u32, usable_ace: bool, dealer_card: u32) -> PlayerState {
        PlayerState {
            dealer_card,
            player_sum,
            usable_ace,
        }
    }

    // Exploring start: every learned state has positive probability regardless of the policy.
    pub fn random<R: Rng + ?Sized>(rng: &mut R, dealer_cards: &RangeInclusive<u32>) -> PlayerState {
        PlayerState::new(
            rng.gen_range(PLAYER_SUMS),
            rng.gen_bool(0.5),
            rng.gen_range(dealer_cards.clone()),
        )
    }

    pub fn dealer_card(&self) -> u32 {
        self.dealer_card
    }

    pub fn player_sum(&self) -> u32 {
        self.player_sum
    }

    pub fn usable_ace(&self) -> bool {
        self.usable_ace
    }
}

impl StateAction {
    pub fn new(state: PlayerState, action: Action) -> StateAction {
        StateAction { state, action }
    }
}

impl PlayerHand {
    pub fn new(value: u32, usable_ace: bool) -> PlayerHand {
        PlayerHand { value, usable_ace }
    }

    pub fn from_cards(cards: &[u32]) -> PlayerHand {
        cards
            .iter()
            .fold(PlayerHand::default(), |hand, card| hand.add_card(*card))
    }

    pub fn add_card(&self, card: u32) -> PlayerHand {
        let mut hand = *self;
        if card == ACE && !hand.usable_ace && hand.value + ACE_ALT_VALUE <= MAX_VALUE {
            hand.usable_ace = true;
            hand.value += ACE_ALT_VALUE;
        } else {
            hand.value += card;
        }

        // Only one ace is ever counted as 11, so at most one conversion is needed.
        if hand.value > MAX_VALUE && hand.usable_ace {
            hand.value -= ACE_ALT_VALUE - ACE;
            hand.usable_ace = false;
        }
        hand
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn usable_ace(&self) -> bool {
        self.usable_ace
    }

    pub fn is_bust(&self) -> bool {
        self.value > MAX_VALUE
    }
}

impl Player {
    pub fn new(hand: PlayerHand, dealer_card: u32) -> Player {
        Player {
            hand,
            dealer_card,
            usable_ace: hand.usable_ace(),
        }
    }

    pub fn from_state(state: &PlayerState) -> Player {
        Player::new(
            PlayerHand::new(state.player_sum, state.usable_ace),
            state.dealer_card,
        )
    }

    pub fn state(&self) -> PlayerState {
        PlayerState::new(self.hand.value, self.usable_ace, self.dealer_card)
    }

    pub fn add_card(&mut self, card: u32) {
        self.hand = self.hand.add_card(card);
    }

    pub fn value(&self) -> u32 {
        self.hand.value()
    }

    pub fn is_bust(&self) -> bool {
        self.hand.is_bust()
    }
}

impl DealerHand {
    pub fn new(up_card: u32) -> DealerHand {
        DealerHand {
            cards: vec![up_card],
        }
    }

    pub fn from_cards(cards: &[u32]) -> DealerHand {
        DealerHand {
            cards: cards.to_vec(),
        }
    }

    pub fn add_card(&mut self, card: u32) {
        self.cards.push(card);
    }

    // Recomputed from the cards every time. All aces count 1, then one of them is
    // promoted to 11 if the hand stays within 21; two aces at 11 always bust.
    pub fn value(&self) -> u32 {
        let hard: u32 = self.cards.iter().sum();
        let has_ace = self.cards.iter().any(|c| *c == ACE);
        if has_ace && hard + ACE_ALT_VALUE - ACE <= MAX_VALUE {
            hard + ACE_ALT_VALUE - ACE
        } else {
            hard
        }
    }

    pub fn is_bust(&self) -> bool {
        self.value() > MAX_VALUE
    }

    pub fn will_hit(&self) -> bool {
        self.value() < DEALER_STICK_VALUE
    }
}

pub fn draw_card<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    rng.gen_range(1..=13u32).min(FACE_VALUE)
}

// Dealer takes cards until they reach 17.
pub fn play_dealer<D: FnMut() -> u32>(dealer: &mut DealerHand, draw: &mut D) {
    while !dealer.is_bust() && dealer.will_hit() {
        dealer.add_card(draw());
    }
}

// Plays a normally dealt hand: two cards for the player, the open card and the
// hole card for the dealer. The player takes cards without asking the policy
// until the hand reaches the learned range.
pub fn play_hand<R, P>(rng: &mut R, policy: &P) -> Outcome
where
    R: Rng + ?Sized,
    P: Fn(&PlayerState) -> Action,
{
    let dealer_card = draw_card(rng);
    let mut hand = PlayerHand::from_cards(&[draw_card(rng), draw_card(rng)]);
    while hand.value() < MIN_PLAYER_SUM {
        hand = hand.add_card(draw_card(rng));
    }

    let mut player = Player::new(hand, dealer_card);

    while !player.is_bust() && policy(&player.state()).is_hit() {
        player.add_card(draw_card(rng));
    }
    if player.is_bust() {
        return Outcome::Loss;
    }

    let mut dealer = DealerHand::from_cards(&[dealer_card, draw_card(rng)]);
    play_dealer(&mut dealer, &mut || draw_card(rng));
    Outcome::showdown(player.value(), &dealer)
}

// A policy that only sticks on 20 or higher.
pub fn stick_at_20(state: &PlayerState) -> Action {
    Action::from(state.player_sum < 20)
}
