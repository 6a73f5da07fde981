// src/dialogue.rs

//! Support chat: which script primes the completion call, the local decline gate, and the
//! persisted conversation.

use crate::{
    constants::keys,
    error::AppResult,
    models::{ChatMessage, ChatRole},
    storage::{self, KeyValueStore},
};
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

pub const HARD_DECLINE: &str = "Merci pour votre précision.\n\nDans ce cas, lorsque la porte est fermée à clé, nos plans d'action pédagogiques à distance ne sont pas adaptés.\n\nPour éviter tout risque de dommage ou de situation illégale, nous vous recommandons de faire appel à un professionnel sur place.\n\nSerrureMaster intervient uniquement sur des situations compatibles (porte claquée non verrouillée).\n\nSi vous avez une autre situation ou une question générale, je reste à votre disposition.";

pub const SOFT_ORIENTATION: &str = "D’après les éléments fournis, un plan d’action peut être adapté à votre situation. Les étapes complètes sont disponibles dans l’espace membre après validation de la commande.";

pub const UNCLEAR_REPLY: &str =
    "Je ne suis pas sûr de comprendre. Pouvez-vous préciser votre situation ?";

pub const TECHNICAL_ERROR_REPLY: &str =
    "Une erreur technique est survenue. Merci de réessayer plus tard.";

const CUSTOMER_GREETING: &str = "Bonjour, vous êtes en contact avec l’assistance SerrureMaster.\n\nJe suis là pour vous orienter dans l'utilisation de vos guides.\nPour rappel, je ne peux pas fournir d'instructions techniques détaillées ici.\n\nComment puis-je vous aider ?";

const PROSPECT_GREETING: &str = "Bonjour, vous êtes en contact avec l’assistance SerrureMaster.\n\nNous proposons un accompagnement pédagogique à distance pour certaines situations de serrurerie compatibles.\n\nJe vais vous poser quelques questions pour vérifier votre situation.\n\nLa porte est-elle simplement claquée ou fermée à clé ?";

const CUSTOMER_CONTEXT: &str = "CONTEXTE : L'utilisateur est CLIENT (a déjà acheté).
TON RÔLE : Assistant Technique SerrureMaster (Support Post-Achat).

RÈGLES STRICTES :
1. NE JAMAIS donner d'instructions techniques détaillées ou de méthode complète dans le chat.
2. Pour toute question technique, renvoyer vers les guides PDF/Vidéo de l'espace membre.
3. Si l'utilisateur est bloqué, lui proposer d'envoyer une photo via WhatsApp pour validation visuelle.
4. Rappeler que le service est une obligation de moyens, pas de résultat.

MESSAGE TYPE DE CADRAGE :
\"L’assistance par chat ne remplace pas le guide complet et ne permet pas de transmettre des instructions techniques détaillées. Merci de vous référer à la vidéo du Module concerné.\"";

const PROSPECT_CONTEXT_HEAD: &str = "CONTEXTE : L'utilisateur est VISITEUR (Prospection).
TON RÔLE : Assistant Technique SerrureMaster (Filtrage & Orientation).
OBJECTIF : Qualifier la situation pour vérifier la compatibilité avec nos guides payants.

TON ATTENDU :
- Professionnel, neutre, calme.
- Messages courts (style WhatsApp).
- Zéro jargon technique.
- Zéro promesse de réussite.
- Zéro détail technique exploitable.

SCRIPT DE CONVERSATION OBLIGATOIRE :

PHASE 1 : QUALIFICATION (Si l'info n'est pas déjà donnée)
- \"La porte est-elle simplement claquée ou fermée à clé ?\"
- \"Êtes-vous le propriétaire ou avez-vous un droit d’accès légitime au logement ?\"
- \"S'agit-il d'une porte standard ou blindée ?\"

PHASE 2 : ANALYSE & ORIENTATION (Logique stricte)

CAS A : Porte Verrouillée (Fermée à clé) OU Pas de droit d'accès OU Situation dangereuse
-> RÉPONSE TYPE OBLIGATOIRE (mot pour mot) :";

const PROSPECT_CONTEXT_CASE_B: &str = "CAS B : Porte Claquée + Droit d'accès confirmé
-> RÉPONSE TYPE (Orientation Vente) :";

const PROSPECT_CONTEXT_TAIL: &str = "(Si l'utilisateur insiste pour avoir la technique : \"L’assistance ne remplace pas un guide complet. Si vous souhaitez accéder au plan d’action, vous pouvez le retrouver directement sur le site.\")

RÈGLE D'OR : En cas de doute, recommander de ne pas agir.";

const GLOBAL_RULES: &str = "RÈGLES GLOBALES :
- Ne sors JAMAIS de ton rôle.
- Ne donne JAMAIS la solution technique. C'est le produit vendu.
- Reste courtois mais ferme sur le cadre légal.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialogueBranch {
    Customer,
    Prospect,
}

impl DialogueBranch {
    pub fn for_entitlement(viewer_is_entitled: bool) -> Self {
        if viewer_is_entitled {
            DialogueBranch::Customer
        } else {
            DialogueBranch::Prospect
        }
    }

    pub fn greeting(self) -> &'static str {
        match self {
            DialogueBranch::Customer => CUSTOMER_GREETING,
            DialogueBranch::Prospect => PROSPECT_GREETING,
        }
    }
}

/// Instruction script priming the completion call.
pub fn select_system_prompt(viewer_is_entitled: bool) -> String {
    let context = match DialogueBranch::for_entitlement(viewer_is_entitled) {
        DialogueBranch::Customer => CUSTOMER_CONTEXT.to_string(),
        DialogueBranch::Prospect => format!(
            "{}\n\"{}\"\n\n{}\n\"{}\"\n{}",
            PROSPECT_CONTEXT_HEAD,
            HARD_DECLINE,
            PROSPECT_CONTEXT_CASE_B,
            SOFT_ORIENTATION,
            PROSPECT_CONTEXT_TAIL
        ),
    };
    format!(
        "Tu es l'Assistant Technique SerrureMaster sur WhatsApp.\n{}\n\n{}",
        context, GLOBAL_RULES
    )
}

// Text is accent-folded and lowercased before matching.
static LOCKED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"ferme\w*\s+(?:a|avec\s+la)\s+cle|cle\s+(?:est\s+)?tourne\w*|verrouill\w*|a\s+double\s+tour|\blocked\b").unwrap()
});
static NO_ACCESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:pas|aucun|sans)\s+(?:de\s+|le\s+|d'|du\s+)?(?:droit|proprietaire|locataire|acces)|\bpas\s+chez\s+moi\b|\bchez\s+(?:mon|ma|un|une)\s+(?:voisin|voisine|ex)\b").unwrap()
});

fn fold(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| match c {
            'à' | 'â' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'î' | 'ï' => 'i',
            'ô' | 'ö' => 'o',
            'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            '’' => '\'',
            other => other,
        })
        .collect()
}

fn is_negated(prefix: &str) -> bool {
    matches!(
        prefix.split_whitespace().last(),
        Some("non" | "pas" | "sans" | "jamais")
    )
}

/// Local gate for the safety-critical decline: a locked door or missing access rights.
/// "non verrouillée" and similar negations do not trigger it.
pub fn requires_hard_decline(text: &str) -> bool {
    let folded = fold(text);
    let locked = LOCKED_RE
        .find_iter(&folded)
        .any(|m| !is_negated(&folded[..m.start()]));
    locked || NO_ACCESS_RE.is_match(&folded)
}

/// Text generation behind the chat.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// `Ok(None)` means the service answered without usable text.
    async fn complete(&self, system_instruction: &str, turns: &[ChatMessage]) -> AppResult<Option<String>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    branch: DialogueBranch,
    messages: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn start(viewer_is_entitled: bool) -> Self {
        let branch = DialogueBranch::for_entitlement(viewer_is_entitled);
        Self {
            branch,
            messages: vec![message(ChatRole::Model, branch.greeting())],
        }
    }

    /// Resumes the stored conversation when it was started under the same branch.
    pub fn load_or_start(store: &dyn KeyValueStore, viewer_is_entitled: bool) -> Self {
        let mut session = storage::load_json::<ChatSession>(store, keys::CHAT)
            .filter(|s| !s.messages.is_empty())
            .unwrap_or_else(|| Self::start(viewer_is_entitled));
        session.sync_entitlement(viewer_is_entitled);
        session
    }

    pub fn branch(&self) -> DialogueBranch {
        self.branch
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Starts over with the new branch's greeting when entitlement changed. No history is kept.
    pub fn sync_entitlement(&mut self, viewer_is_entitled: bool) -> bool {
        if DialogueBranch::for_entitlement(viewer_is_entitled) == self.branch {
            return false;
        }
        info!("Changement de statut client, conversation réinitialisée");
        *self = Self::start(viewer_is_entitled);
        true
    }

    /// Appends the visitor's message and the reply, and returns the reply.
    pub async fn send(&mut self, text: &str, backend: Option<&dyn CompletionBackend>) -> String {
        let text = text.trim();
        self.messages.push(message(ChatRole::User, text));

        let reply = if requires_hard_decline(text) {
            debug!("Refus ferme déclenché localement");
            HARD_DECLINE.to_string()
        } else if let Some(backend) = backend {
            let instruction = select_system_prompt(self.branch == DialogueBranch::Customer);
            match backend.complete(&instruction, &self.messages).await {
                Ok(Some(reply)) => reply,
                Ok(None) => UNCLEAR_REPLY.to_string(),
                Err(e) => {
                    warn!("Réponse de l'assistant impossible: {}", e);
                    TECHNICAL_ERROR_REPLY.to_string()
                }
            }
        } else {
            debug!("Aucun service de génération configuré");
            TECHNICAL_ERROR_REPLY.to_string()
        };

        self.messages.push(message(ChatRole::Model, &reply));
        reply
    }

    pub fn save(&self, store: &dyn KeyValueStore) -> AppResult<()> {
        storage::save_json(store, keys::CHAT, self)
    }

    pub fn discard(store: &dyn KeyValueStore) -> AppResult<()> {
        store.remove(keys::CHAT)
    }
}

fn message(role: ChatRole, text: &str) -> ChatMessage {
    ChatMessage {
        role,
        text: text.to_string(),
        timestamp: Utc::now().timestamp_millis(),
    }
}
