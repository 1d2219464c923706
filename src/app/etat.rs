//! src/app/etat.rs
//!
//! État UI (sans vue, sans noyau).
//!
//! Rôle : contenir l’état de la calculatrice (entrée, liaisons, résultats, erreur, démarche)
//! et offrir des opérations simples (C/CLR/AC) sans logique d’affichage.
//!
//! Contrats :
//! - Aucune évaluation ici (pas de parsing).
//! - Actions déterministes, sans effet de bord caché.

/// Liaisons proposées au démarrage.
const LIAISONS_DEFAUT: &str = "x=4; y=2";

#[derive(Clone, Default, Debug)]
pub struct Demarche {
    pub termes: String,
    pub arbre: String,
    pub imprime: String,
    pub simplifie: String,
    pub note: String,
}

#[derive(Clone, Debug)]
pub struct AppCalc {
    // --- entrée utilisateur ---
    pub entree: String,
    pub liaisons: String, // "x=4; y=2"

    // --- sorties ---
    pub interprete: String, // évaluation directe
    pub compile: String,    // exécutable compilé
    pub accord: bool,       // les deux chemins concordent
    pub variables: String,  // "x = 4, y = 2"
    pub erreur: String,

    // --- démarche (panneau d’explication) ---
    pub demarche: Demarche,

    // --- UX ---
    pub focus_entree: bool,
}

impl Default for AppCalc {
    fn default() -> Self {
        Self {
            entree: String::new(),
            liaisons: LIAISONS_DEFAUT.to_string(),
            interprete: String::new(),
            compile: String::new(),
            accord: false,
            variables: String::new(),
            erreur: String::new(),
            demarche: Demarche::default(),
            focus_entree: true,
        }
    }
}

impl AppCalc {
    /* ------------------------ Actions “boutons” (état seulement) ------------------------ */

    /// AC : remise à zéro totale (entrée + liaisons par défaut + résultats).
    pub fn reset_total(&mut self) {
        self.entree.clear();
        self.liaisons = LIAISONS_DEFAUT.to_string();
        self.clear_resultats();
        self.focus_entree = true;
    }

    /// C : effacer seulement l’entrée (sans toucher aux résultats).
    pub fn clear_entree(&mut self) {
        self.entree.clear();
        self.focus_entree = true;
    }

    /// CLR : effacer résultats + erreur + démarche (sans toucher à l’entrée).
    pub fn clear_resultats(&mut self) {
        self.interprete.clear();
        self.compile.clear();
        self.accord = false;
        self.variables.clear();
        self.erreur.clear();
        self.demarche = Demarche::default();
        self.focus_entree = true;
    }

    /// Erreur : on CONSERVE le dernier résultat, la démarche (devenue fausse) est effacée.
    pub fn set_erreur(&mut self, msg: impl Into<String>) {
        self.erreur = msg.into();
        self.demarche = Demarche::default();
        self.focus_entree = true;
    }

    /// Dépose un résultat complet.
    pub fn set_resultats(
        &mut self,
        interprete: impl Into<String>,
        compile: impl Into<String>,
        accord: bool,
        variables: impl Into<String>,
        demarche: Demarche,
    ) {
        self.erreur.clear();
        self.interprete = interprete.into();
        self.compile = compile.into();
        self.accord = accord;
        self.variables = variables.into();
        self.demarche = demarche;
        self.focus_entree = true;
    }
}
