// src/app/vue.rs
//
// Vue (UI egui) — natif + web
// ---------------------------
// - Même AppCalc (etat.rs) pour natif + wasm
// - Clavier : Enter évalue (quand un champ est focus)
// - Tactile : boutons d’insertion, focus redonné après clic (focus_entree)
//
// Note :
// - PAS de Key::NumEnter (n’existe pas dans egui 0.33.x)

use eframe::egui;

use calculatrice_arbre::noyau::eval::{eval_expression, format_valeur};

use super::etat::{AppCalc, Demarche};

impl AppCalc {
    /// UI principale : à appeler depuis eframe::App::update(...)
    pub fn ui(&mut self, ui: &mut egui::Ui) {
        ui.spacing_mut().item_spacing = egui::vec2(6.0, 6.0);

        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                ui.heading("Calculatrice en arbre");
                ui.add_space(6.0);

                self.ui_entree(ui);

                ui.add_space(8.0);
                ui.separator();
                ui.add_space(8.0);

                self.ui_resultats(ui);

                ui.add_space(8.0);
                ui.separator();
                ui.add_space(8.0);

                self.ui_demarche(ui);
            });
    }

    fn ui_entree(&mut self, ui: &mut egui::Ui) {
        ui.label("Entrée :");

        let resp = ui.add(
            egui::TextEdit::singleline(&mut self.entree)
                .desired_width(ui.available_width())
                .hint_text("Ex: 2x^4-7x^3+Sum[i=0..3]{i*x^i}, (x>3)?7:-8")
                .id_source("entree_edit")
                .code_editor(),
        );

        if self.focus_entree {
            resp.request_focus();
            self.focus_entree = false;
        }

        ui.label("Variables :");
        let resp_liaisons = ui.add(
            egui::TextEdit::singleline(&mut self.liaisons)
                .desired_width(ui.available_width())
                .hint_text("x=4; y=pi/2")
                .id_source("liaisons_edit")
                .code_editor(),
        );

        // Enter évalue (seulement si un des deux champs est focus)
        let enter = ui.input(|i| i.key_pressed(egui::Key::Enter));
        if enter && (resp.has_focus() || resp.lost_focus() || resp_liaisons.lost_focus()) {
            self.eval_via_noyau();
        }

        ui.add_space(6.0);

        ui.horizontal(|ui| {
            // Contrat: C = entrée seulement ; CLR = résultats seulement ; AC = tout
            self.bouton_action(ui, "C", "Efface seulement l’entrée", Action::ClearEntree);
            self.bouton_action(
                ui,
                "CLR",
                "Efface résultats + erreur + démarche",
                Action::ClearResultats,
            );
            self.bouton_action(ui, "AC", "Remise à zéro totale", Action::ResetTotal);
        });

        ui.add_space(8.0);

        ui.horizontal_wrapped(|ui| {
            for op in ["+", "-", "*", "/", "^", "(", ")"] {
                self.bouton_insert(ui, op, op, InsertKind::Op);
            }

            ui.separator();

            for op in ["=", "≠", ">", "<", "&", "|", "!", "?", ":"] {
                self.bouton_insert(ui, op, op, InsertKind::Op);
            }

            ui.separator();

            self.bouton_insert(ui, "pi", "pi", InsertKind::Word);
            self.bouton_insert(ui, "x", "x", InsertKind::Word);
            self.bouton_insert(ui, "y", "y", InsertKind::Word);
            self.bouton_insert(ui, "sqrt", "sqrt(", InsertKind::Func);
            self.bouton_insert(ui, "sin", "sin(", InsertKind::Func);
            self.bouton_insert(ui, "Σ", "Sum[i=0..10]{", InsertKind::Func);
            self.bouton_insert(ui, "∫", "Integral[t=0..1]{", InsertKind::Func);

            ui.add_space(10.0);

            let eq = ui.add_sized([64.0, 32.0], egui::Button::new("Calculer"));
            if eq.clicked() {
                self.eval_via_noyau();
            }
        });

        if !self.erreur.is_empty() {
            ui.add_space(6.0);
            ui.colored_label(ui.visuals().error_fg_color, &self.erreur);
        }
    }

    fn ui_resultats(&mut self, ui: &mut egui::Ui) {
        ui.label("Interprété :");
        Self::champ_monospace(ui, "interprete_out", &self.interprete, 1);

        ui.add_space(6.0);

        ui.label("Compilé :");
        Self::champ_monospace(ui, "compile_out", &self.compile, 1);

        if !self.interprete.is_empty() {
            if self.accord {
                ui.label("Les deux chemins concordent.");
            } else {
                ui.colored_label(ui.visuals().warn_fg_color, "Écart entre interprété et compilé !");
            }
        }

        if !self.variables.is_empty() {
            ui.add_space(6.0);
            ui.label("Variables :");
            Self::champ_monospace(ui, "variables_out", &self.variables, 1);
        }
    }

    fn ui_demarche(&mut self, ui: &mut egui::Ui) {
        egui::CollapsingHeader::new("Démarche")
            .default_open(true)
            .show(ui, |ui| {
                Self::champ_demarche(ui, "Termes", "demarche_termes", &self.demarche.termes, 2);
                Self::champ_demarche(ui, "Arbre", "demarche_arbre", &self.demarche.arbre, 6);
                Self::champ_demarche(ui, "Réimpression", "demarche_imprime", &self.demarche.imprime, 1);
                Self::champ_demarche(ui, "Constantes pliées", "demarche_simplifie", &self.demarche.simplifie, 1);
                Self::champ_demarche(ui, "Note", "demarche_note", &self.demarche.note, 2);
            });
    }

    fn champ_demarche(ui: &mut egui::Ui, titre: &str, id: &str, contenu: &str, rows: usize) {
        ui.add_space(4.0);
        ui.label(format!("{titre} :"));
        Self::champ_monospace(ui, id, contenu, rows);
    }

    fn champ_monospace(ui: &mut egui::Ui, id: &str, contenu: &str, rows: usize) {
        // Lecture seule “stable”, sans TextEdit interactif.
        egui::Frame::group(ui.style())
            .fill(ui.visuals().extreme_bg_color)
            .show(ui, |ui| {
                ui.push_id(id, |ui| {
                    ui.set_min_width(ui.available_width());
                    ui.set_min_height(
                        rows as f32 * ui.text_style_height(&egui::TextStyle::Monospace),
                    );
                    ui.monospace(contenu);
                });
            });
    }

    fn bouton_action(&mut self, ui: &mut egui::Ui, label: &str, tip: &str, action: Action) {
        let resp = ui
            .add_sized([56.0, 30.0], egui::Button::new(label))
            .on_hover_text(tip);

        if resp.clicked() {
            match action {
                Action::ClearEntree => self.clear_entree(),
                Action::ClearResultats => self.clear_resultats(),
                Action::ResetTotal => self.reset_total(),
            }
            self.focus_entree = true;
        }
    }

    fn bouton_insert(&mut self, ui: &mut egui::Ui, label: &str, to_insert: &str, kind: InsertKind) {
        let resp = ui.add_sized([40.0, 28.0], egui::Button::new(label));
        if !resp.clicked() || to_insert.is_empty() {
            return;
        }

        match kind {
            InsertKind::Op => {
                self.entree.push_str(to_insert);
            }
            InsertKind::Func | InsertKind::Word => {
                // un espace si juste avant c’est une lettre ou un chiffre (sinon les mots se collent)
                let last = self.entree.chars().next_back();
                if let Some(c) = last {
                    if c.is_alphanumeric() {
                        self.entree.push(' ');
                    }
                }
                self.entree.push_str(to_insert);
            }
        }

        self.focus_entree = true;
    }

    /// Évalue via le noyau, puis dépose résultats + démarche dans l’état UI.
    fn eval_via_noyau(&mut self) {
        let s = self.entree.trim();
        if s.is_empty() {
            self.set_erreur("Entrée vide");
            return;
        }

        match eval_expression(s, &self.liaisons) {
            Ok(r) => {
                let variables = r
                    .variables
                    .iter()
                    .map(|(n, v)| format!("{n} = {}", format_valeur(*v)))
                    .collect::<Vec<_>>()
                    .join(", ");
                let d = Demarche {
                    termes: r.demarche.termes,
                    arbre: r.demarche.arbre,
                    imprime: r.demarche.imprime,
                    simplifie: r.demarche.simplifie,
                    note: r.demarche.note,
                };
                self.set_resultats(
                    format_valeur(r.interprete),
                    format_valeur(r.compile),
                    r.accord,
                    variables,
                    d,
                );
            }
            Err(e) => {
                tracing::info!(erreur = %e, "évaluation refusée");
                self.set_erreur(e.to_string());
            }
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Action {
    ClearEntree,
    ClearResultats,
    ResetTotal,
}

#[derive(Clone, Copy, Debug)]
enum InsertKind {
    Word,
    Func,
    Op,
}
