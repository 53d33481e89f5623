//! Day screen: calendar, medications active on the selected date, and the
//! doses taken today.
//!
//! "Today" is injected when the screen is mounted. Doses are always recorded
//! against it; selecting another calendar day only changes which medications
//! are listed.

use crate::schedule::{build_marking_map, dose_checklist, filter_active_on, DoseSlot, MarkingMap};
use crate::store::MedicationRepository;
use crate::{DoseEvent, DoseStatus, Error, Medication, NewDoseEvent, Result, TimeOfDay};
use chrono::NaiveDate;

/// Detail dialog of the day screen
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DayModal {
    #[default]
    Closed,
    Open(i64),
}

/// Controller of the day screen
pub struct TodayScreen<'r, R: MedicationRepository> {
    repo: &'r R,
    today: NaiveDate,
    selected: NaiveDate,
    medications: Vec<Medication>,
    entries: Vec<DoseEvent>,
    modal: DayModal,
}

impl<'r, R: MedicationRepository> TodayScreen<'r, R> {
    /// Open the screen with `today` selected and load its data
    pub fn mount(repo: &'r R, today: NaiveDate) -> Result<Self> {
        let mut screen = Self {
            repo,
            today,
            selected: today,
            medications: Vec::new(),
            entries: Vec::new(),
            modal: DayModal::Closed,
        };
        screen.refresh()?;
        Ok(screen)
    }

    /// Re-read medications and today's dose events
    pub fn refresh(&mut self) -> Result<()> {
        let medications = self.repo.list_medications()?;
        let entries = self.repo.list_dose_events_for_date(self.today)?;
        self.medications = medications;
        self.entries = entries;
        Ok(())
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn selected_date(&self) -> NaiveDate {
        self.selected
    }

    pub fn select_date(&mut self, date: NaiveDate) {
        self.selected = date;
    }

    pub fn modal(&self) -> DayModal {
        self.modal
    }

    pub fn medications(&self) -> &[Medication] {
        &self.medications
    }

    /// Dose events recorded today
    pub fn entries(&self) -> &[DoseEvent] {
        &self.entries
    }

    /// Calendar dots for every medication, with the selected date flagged
    pub fn marking_map(&self) -> MarkingMap {
        build_marking_map(&self.medications, self.selected)
    }

    /// Medications active on the selected date, in list order
    pub fn active_medications(&self) -> Vec<&Medication> {
        filter_active_on(&self.medications, self.selected)
    }

    /// Today's scheduled doses and whether each was taken
    pub fn checklist(&self) -> Vec<DoseSlot> {
        dose_checklist(&self.medications, &self.entries, self.today)
    }

    /// Open the detail dialog of a medication active on the selected date
    pub fn open_medication(&mut self, id: i64) -> Result<&Medication> {
        let medication = self.medications.iter().find(|m| m.id == id).ok_or(Error::NotFound {
            entity: "medication",
            id,
        })?;

        if !crate::schedule::is_active_on(medication, self.selected) {
            return Err(Error::Validation(format!(
                "{} is not scheduled on {}",
                medication.name, self.selected
            )));
        }

        self.modal = DayModal::Open(id);
        Ok(medication)
    }

    pub fn close(&mut self) {
        self.modal = DayModal::Closed;
    }

    /// Medication shown in the open dialog
    pub fn open_medication_details(&self) -> Option<&Medication> {
        match self.modal {
            DayModal::Open(id) => self.medications.iter().find(|m| m.id == id),
            DayModal::Closed => None,
        }
    }

    /// Today's dose events of the open medication
    pub fn entries_for_open(&self) -> Vec<&DoseEvent> {
        match self.modal {
            DayModal::Open(id) => self.entries.iter().filter(|e| e.medication_id == id).collect(),
            DayModal::Closed => Vec::new(),
        }
    }

    /// Record one of the open medication's times as taken today
    pub fn mark_taken(&mut self, time: TimeOfDay) -> Result<DoseEvent> {
        let medication = self
            .open_medication_details()
            .ok_or_else(|| Error::Validation("no medication selected".into()))?;

        if !medication.is_scheduled_at(time) {
            return Err(Error::Validation(format!(
                "{} is not a scheduled time of {}",
                time, medication.name
            )));
        }

        let input = NewDoseEvent {
            medication_id: medication.id,
            time_taken: time,
            date: self.today,
            status: DoseStatus::Done,
        };
        let event = self.repo.create_dose_event(&input)?;
        self.refresh()?;
        Ok(event)
    }

    /// Remove a dose event; returns whether it existed
    pub fn delete_entry(&mut self, entry_id: i64) -> Result<bool> {
        let removed = self.repo.delete_dose_event(entry_id)?;
        self.refresh()?;
        Ok(removed)
    }

    pub fn update_entry_status(&mut self, entry_id: i64, status: &DoseStatus) -> Result<()> {
        self.repo.update_dose_event_status(entry_id, status)?;
        self.refresh()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use crate::NewMedication;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn time(s: &str) -> TimeOfDay {
        s.parse().unwrap()
    }

    fn seeded_store() -> (SqliteStore, Medication, Medication) {
        let store = SqliteStore::open_in_memory().unwrap();
        let morning = store
            .create_medication(&NewMedication {
                name: "Metformin".into(),
                amount: "500".into(),
                times: vec![time("08:00"), time("20:00")],
                period: "2024-03-01 to 2024-03-31".parse().unwrap(),
                color: "#2196F3".into(),
            })
            .unwrap();
        let later = store
            .create_medication(&NewMedication {
                name: "Vitamin D".into(),
                amount: "10".into(),
                times: vec![time("12:00")],
                period: "2024-03-15 to 2024-04-15".parse().unwrap(),
                color: "#FF9800".into(),
            })
            .unwrap();
        (store, morning, later)
    }

    #[test]
    fn test_mount_selects_today() {
        let (store, morning, _) = seeded_store();
        let screen = TodayScreen::mount(&store, date("2024-03-10")).unwrap();

        assert_eq!(screen.selected_date(), date("2024-03-10"));
        let active: Vec<i64> = screen.active_medications().iter().map(|m| m.id).collect();
        assert_eq!(active, vec![morning.id]);

        let map = screen.marking_map();
        assert!(map.get(date("2024-03-10")).unwrap().selected);
        assert_eq!(map.dot_count(date("2024-03-20")), 2);
    }

    #[test]
    fn test_select_date_changes_active_list() {
        let (store, morning, later) = seeded_store();
        let mut screen = TodayScreen::mount(&store, date("2024-03-10")).unwrap();

        screen.select_date(date("2024-03-20"));
        let active: Vec<i64> = screen.active_medications().iter().map(|m| m.id).collect();
        assert_eq!(active, vec![morning.id, later.id]);

        screen.select_date(date("2024-05-01"));
        assert!(screen.active_medications().is_empty());
    }

    #[test]
    fn test_mark_taken_records_today() {
        let (store, morning, _) = seeded_store();
        let mut screen = TodayScreen::mount(&store, date("2024-03-10")).unwrap();

        screen.open_medication(morning.id).unwrap();
        let event = screen.mark_taken(time("08:00")).unwrap();

        assert_eq!(event.date, date("2024-03-10"));
        assert_eq!(event.status, DoseStatus::Done);
        assert_eq!(screen.entries_for_open(), vec![&event]);

        let checklist = screen.checklist();
        assert_eq!(checklist.len(), 2);
        assert_eq!(checklist[0].taken_by, Some(event.id));
        assert!(!checklist[1].is_taken());
    }

    #[test]
    fn test_mark_taken_rejects_unscheduled_time() {
        let (store, morning, _) = seeded_store();
        let mut screen = TodayScreen::mount(&store, date("2024-03-10")).unwrap();

        assert!(screen.mark_taken(time("08:00")).is_err());

        screen.open_medication(morning.id).unwrap();
        assert!(matches!(
            screen.mark_taken(time("09:00")),
            Err(Error::Validation(_))
        ));
        assert!(screen.entries().is_empty());
    }

    #[test]
    fn test_open_requires_active_medication() {
        let (store, _, later) = seeded_store();
        let mut screen = TodayScreen::mount(&store, date("2024-03-10")).unwrap();

        assert!(matches!(
            screen.open_medication(later.id),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            screen.open_medication(999),
            Err(Error::NotFound { .. })
        ));
        assert_eq!(screen.modal(), DayModal::Closed);
    }

    #[test]
    fn test_delete_and_update_entries() {
        let (store, morning, _) = seeded_store();
        let mut screen = TodayScreen::mount(&store, date("2024-03-10")).unwrap();
        screen.open_medication(morning.id).unwrap();
        let first = screen.mark_taken(time("08:00")).unwrap();
        let second = screen.mark_taken(time("20:00")).unwrap();

        screen
            .update_entry_status(second.id, &DoseStatus::Other("late".into()))
            .unwrap();
        assert_eq!(screen.entries()[1].status, DoseStatus::Other("late".into()));

        assert!(screen.delete_entry(first.id).unwrap());
        assert!(!screen.delete_entry(first.id).unwrap());
        assert_eq!(screen.entries().len(), 1);

        screen.close();
        assert!(screen.entries_for_open().is_empty());
    }

    #[test]
    fn test_entries_only_cover_today() {
        let (store, morning, _) = seeded_store();
        store
            .create_dose_event(&NewDoseEvent {
                medication_id: morning.id,
                time_taken: time("08:00"),
                date: date("2024-03-09"),
                status: DoseStatus::Done,
            })
            .unwrap();

        let screen = TodayScreen::mount(&store, date("2024-03-10")).unwrap();
        assert!(screen.entries().is_empty());
        assert!(screen.checklist().iter().all(|slot| !slot.is_taken()));
    }
}
