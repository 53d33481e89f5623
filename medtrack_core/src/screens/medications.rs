//! Medication management screen: list, create, edit and delete.

use crate::picker::{period_marking, PeriodMark, RangeSelection};
use crate::schedule::DateRange;
use crate::store::MedicationRepository;
use crate::time::format_time_entry;
use crate::{Error, Medication, NewMedication, Result, TimeOfDay};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Form fields of the create/edit dialog
#[derive(Clone, Debug, PartialEq)]
pub struct MedicationForm {
    pub name: String,
    pub amount: String,
    /// Time being typed, already passed through the input mask
    pub time_entry: String,
    pub times: Vec<TimeOfDay>,
    pub range: RangeSelection,
    pub color: String,
}

impl MedicationForm {
    pub fn new(default_color: &str) -> Self {
        Self {
            name: String::new(),
            amount: String::new(),
            time_entry: String::new(),
            times: Vec::new(),
            range: RangeSelection::Empty,
            color: default_color.to_string(),
        }
    }

    /// Prefill from a stored medication
    ///
    /// A stored period that does not parse leaves the range empty, so the
    /// user has to pick one again before saving.
    pub fn from_medication(medication: &Medication) -> Self {
        let range = match medication.date_range() {
            Ok(range) if !range.is_reversed() => RangeSelection::Complete(range),
            Ok(_) | Err(_) => RangeSelection::Empty,
        };

        Self {
            name: medication.name.clone(),
            amount: medication.amount.clone(),
            time_entry: String::new(),
            times: medication.times.clone(),
            range,
            color: medication.color.clone(),
        }
    }

    /// Replace the time buffer with masked keystrokes
    pub fn set_time_entry(&mut self, raw: &str) {
        self.time_entry = format_time_entry(raw);
    }

    /// Move the time buffer into the schedule
    ///
    /// On failure the buffer is kept so the user can correct it.
    pub fn add_time(&mut self) -> Result<TimeOfDay> {
        let time: TimeOfDay = self.time_entry.trim().parse()?;
        self.times.push(time);
        self.time_entry.clear();
        Ok(time)
    }

    pub fn remove_time(&mut self, index: usize) -> Option<TimeOfDay> {
        (index < self.times.len()).then(|| self.times.remove(index))
    }

    /// Feed a calendar tap to the period picker
    pub fn pick_date(&mut self, date: NaiveDate) {
        self.range = self.range.tap(date);
    }

    pub fn period(&self) -> Option<DateRange> {
        self.range.range()
    }

    /// Picker calendar marks for the current selection, in the form's colour
    pub fn period_marking(&self) -> BTreeMap<NaiveDate, PeriodMark> {
        period_marking(&self.range, &self.color)
    }

    /// Validated input, or why the form cannot be saved yet
    pub fn to_input(&self) -> Result<NewMedication> {
        let period = self
            .period()
            .ok_or_else(|| Error::Validation("please fill all fields (missing: period)".into()))?;

        let input = NewMedication {
            name: self.name.trim().to_string(),
            amount: self.amount.trim().to_string(),
            times: self.times.clone(),
            period,
            color: self.color.clone(),
        };
        input.validate()?;
        Ok(input)
    }
}

/// What the management screen is doing
#[derive(Clone, Debug, Default, PartialEq)]
pub enum EditorState {
    #[default]
    Idle,
    Creating(MedicationForm),
    Editing { id: i64, form: MedicationForm },
    ConfirmingDelete(i64),
}

/// Controller of the medication list
pub struct MedicationsScreen<'r, R: MedicationRepository> {
    repo: &'r R,
    default_color: String,
    medications: Vec<Medication>,
    state: EditorState,
}

impl<'r, R: MedicationRepository> MedicationsScreen<'r, R> {
    /// Open the screen and load the list
    pub fn mount(repo: &'r R, default_color: &str) -> Result<Self> {
        let mut screen = Self {
            repo,
            default_color: default_color.to_string(),
            medications: Vec::new(),
            state: EditorState::Idle,
        };
        screen.refresh()?;
        Ok(screen)
    }

    pub fn refresh(&mut self) -> Result<()> {
        self.medications = self.repo.list_medications()?;
        Ok(())
    }

    pub fn medications(&self) -> &[Medication] {
        &self.medications
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    fn find(&self, id: i64) -> Result<&Medication> {
        self.medications
            .iter()
            .find(|m| m.id == id)
            .ok_or(Error::NotFound {
                entity: "medication",
                id,
            })
    }

    /// Open an empty form, discarding any form in progress
    pub fn start_create(&mut self) {
        self.state = EditorState::Creating(MedicationForm::new(&self.default_color));
    }

    /// Open the form prefilled with a listed medication
    pub fn start_edit(&mut self, id: i64) -> Result<()> {
        let form = MedicationForm::from_medication(self.find(id)?);
        self.state = EditorState::Editing { id, form };
        Ok(())
    }

    /// The open form, if any
    pub fn form_mut(&mut self) -> Option<&mut MedicationForm> {
        match &mut self.state {
            EditorState::Creating(form) | EditorState::Editing { form, .. } => Some(form),
            EditorState::Idle | EditorState::ConfirmingDelete(_) => None,
        }
    }

    /// Persist the open form and return to the list
    ///
    /// Validation failures write nothing and keep the form open.
    pub fn save(&mut self) -> Result<Medication> {
        let saved = match &self.state {
            EditorState::Creating(form) => {
                let input = form.to_input()?;
                self.repo.create_medication(&input)?
            }
            EditorState::Editing { id, form } => {
                let input = form.to_input()?;
                self.repo.update_medication(*id, &input)?
            }
            EditorState::Idle | EditorState::ConfirmingDelete(_) => {
                return Err(Error::Validation("no medication form is open".into()));
            }
        };

        self.refresh()?;
        self.state = EditorState::Idle;
        Ok(saved)
    }

    /// Ask for confirmation before deleting
    pub fn request_delete(&mut self, id: i64) -> Result<()> {
        self.find(id)?;
        self.state = EditorState::ConfirmingDelete(id);
        Ok(())
    }

    /// Delete the medication awaiting confirmation
    ///
    /// Returns whether a row was removed. Dose events of the medication are
    /// kept.
    pub fn confirm_delete(&mut self) -> Result<bool> {
        let EditorState::ConfirmingDelete(id) = self.state else {
            return Err(Error::Validation("no deletion awaiting confirmation".into()));
        };

        let removed = self.repo.delete_medication(id)?;
        self.refresh()?;
        self.state = EditorState::Idle;
        Ok(removed)
    }

    /// Close any form or confirmation without writing
    pub fn cancel(&mut self) {
        self.state = EditorState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn filled_form(screen: &mut MedicationsScreen<'_, SqliteStore>, name: &str) {
        let form = screen.form_mut().unwrap();
        form.name = name.into();
        form.amount = "250".into();
        form.set_time_entry("0800");
        form.add_time().unwrap();
        form.set_time_entry("2000");
        form.add_time().unwrap();
        form.pick_date(date("2024-01-01"));
        form.pick_date(date("2024-01-10"));
    }

    #[test]
    fn test_create_flow() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut screen = MedicationsScreen::mount(&store, "#2196F3").unwrap();
        assert!(screen.medications().is_empty());

        screen.start_create();
        filled_form(&mut screen, "Amoxicillin");
        let saved = screen.save().unwrap();

        assert_eq!(screen.state(), &EditorState::Idle);
        assert_eq!(screen.medications(), &[saved.clone()]);
        assert_eq!(saved.period, "2024-01-01 to 2024-01-10");
        assert_eq!(saved.color, "#2196F3");
        let times: Vec<String> = saved.times.iter().map(|t| t.to_string()).collect();
        assert_eq!(times, vec!["08:00", "20:00"]);
    }

    #[test]
    fn test_invalid_time_keeps_buffer() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut screen = MedicationsScreen::mount(&store, "#2196F3").unwrap();
        screen.start_create();

        let form = screen.form_mut().unwrap();
        form.set_time_entry("2560");
        assert_eq!(form.time_entry, "25:60");
        assert!(matches!(form.add_time(), Err(Error::InvalidTimeFormat(_))));
        assert_eq!(form.time_entry, "25:60");
        assert!(form.times.is_empty());
    }

    #[test]
    fn test_save_without_times_writes_nothing() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut screen = MedicationsScreen::mount(&store, "#2196F3").unwrap();
        screen.start_create();

        let form = screen.form_mut().unwrap();
        form.name = "Aspirin".into();
        form.amount = "100".into();
        form.pick_date(date("2024-01-01"));
        form.pick_date(date("2024-01-02"));

        assert!(matches!(screen.save(), Err(Error::Validation(_))));
        assert!(matches!(screen.state(), EditorState::Creating(_)));
        assert!(store.list_medications().unwrap().is_empty());
    }

    #[test]
    fn test_save_without_period_fails() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut screen = MedicationsScreen::mount(&store, "#2196F3").unwrap();
        screen.start_create();

        let form = screen.form_mut().unwrap();
        form.name = "Aspirin".into();
        form.amount = "100".into();
        form.set_time_entry("0900");
        form.add_time().unwrap();
        form.pick_date(date("2024-01-01"));

        let err = screen.save().unwrap_err();
        assert!(err.to_string().contains("period"));
    }

    #[test]
    fn test_edit_flow_prefills_and_updates() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut screen = MedicationsScreen::mount(&store, "#2196F3").unwrap();
        screen.start_create();
        filled_form(&mut screen, "Amoxicillin");
        let saved = screen.save().unwrap();

        screen.start_edit(saved.id).unwrap();
        let form = screen.form_mut().unwrap();
        assert_eq!(form.name, "Amoxicillin");
        assert_eq!(form.times.len(), 2);
        assert_eq!(form.period().unwrap().to_string(), "2024-01-01 to 2024-01-10");

        form.remove_time(0);
        form.color = "#4CAF50".into();
        let updated = screen.save().unwrap();

        assert_eq!(updated.id, saved.id);
        assert_eq!(updated.times.len(), 1);
        assert_eq!(screen.medications()[0].color, "#4CAF50");
    }

    #[test]
    fn test_edit_unknown_id() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut screen = MedicationsScreen::mount(&store, "#2196F3").unwrap();
        assert!(matches!(
            screen.start_edit(42),
            Err(Error::NotFound { id: 42, .. })
        ));
        assert_eq!(screen.state(), &EditorState::Idle);
    }

    #[test]
    fn test_delete_requires_confirmation() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut screen = MedicationsScreen::mount(&store, "#2196F3").unwrap();
        screen.start_create();
        filled_form(&mut screen, "Amoxicillin");
        let saved = screen.save().unwrap();

        assert!(screen.confirm_delete().is_err());

        screen.request_delete(saved.id).unwrap();
        screen.cancel();
        assert_eq!(screen.medications().len(), 1);

        screen.request_delete(saved.id).unwrap();
        assert_eq!(screen.state(), &EditorState::ConfirmingDelete(saved.id));
        assert!(screen.confirm_delete().unwrap());
        assert!(screen.medications().is_empty());
        assert_eq!(screen.state(), &EditorState::Idle);
    }

    #[test]
    fn test_picker_marking_follows_taps() {
        let mut form = MedicationForm::new("#4CAF50");
        assert!(form.period_marking().is_empty());

        form.pick_date(date("2024-01-03"));
        let marks = form.period_marking();
        assert_eq!(marks.len(), 1);
        assert!(marks[&date("2024-01-03")].starting_day);

        form.pick_date(date("2024-01-01"));
        let marks = form.period_marking();
        assert_eq!(marks.len(), 3);
        assert!(marks[&date("2024-01-01")].starting_day);
        assert!(marks[&date("2024-01-03")].ending_day);
        assert!(marks.values().all(|m| m.color == "#4CAF50"));
    }

    #[test]
    fn test_form_from_malformed_medication_needs_new_period() {
        let medication = Medication {
            id: 1,
            name: "Legacy".into(),
            amount: "5".into(),
            times: vec!["08:00".parse().unwrap()],
            period: "sometime".into(),
            color: "#000000".into(),
        };
        let form = MedicationForm::from_medication(&medication);
        assert_eq!(form.range, RangeSelection::Empty);
        assert!(form.to_input().is_err());
    }
}
